use crate::error::ApiError;
use crate::schemas::{AppState, HealthResponse};
use axum::{extract::State, response::Json};
use tracing::{error, instrument};

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 500, description = "Database is unreachable", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    if let Err(e) = state.db.ping().await {
        error!("Database ping failed: {}", e);
        return Err(ApiError::Internal("Database is unreachable".to_string()));
    }

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: "connected".to_string(),
    }))
}
