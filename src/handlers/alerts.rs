use crate::auth::AuthUser;
use crate::error::{ApiError, ApiJson, ApiPath, MissingFields};
use crate::handlers::acting_user;
use crate::schemas::{ApiResponse, AppState};
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use compute::alerts::{fired_on, upcoming};
use model::entities::alert;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, ModelTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct CreateAlertRequest {
    /// Defaults to the authenticated user
    #[serde(rename = "usuario_id")]
    pub user_id: Option<i32>,
    #[serde(rename = "titulo")]
    pub title: Option<String>,
    #[serde(rename = "descricao")]
    pub description: Option<String>,
    /// Day the alert fires (YYYY-MM-DD)
    #[serde(rename = "data_alerta")]
    pub alert_date: Option<NaiveDate>,
}

/// Partial update of an alert; omitted fields keep their value
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdateAlertRequest {
    pub alert_id: Option<i32>,
    #[serde(rename = "usuario_id")]
    pub user_id: Option<i32>,
    #[serde(rename = "titulo")]
    pub title: Option<String>,
    #[serde(rename = "descricao")]
    pub description: Option<String>,
    #[serde(rename = "data_alerta")]
    pub alert_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AlertResponse {
    pub id: i32,
    #[serde(rename = "usuario_id")]
    pub user_id: i32,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "descricao")]
    pub description: String,
    #[serde(rename = "data_alerta")]
    pub alert_date: NaiveDate,
    #[serde(rename = "criado_em")]
    pub created_at: DateTime<Utc>,
}

impl From<alert::Model> for AlertResponse {
    fn from(model: alert::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            title: model.title,
            description: model.description,
            alert_date: model.alert_date,
            created_at: model.created_at,
        }
    }
}

fn non_blank(field: &'static str, value: String) -> Result<String, ApiError> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(ApiError::MissingFields(vec![field]));
    }
    Ok(value)
}

/// Create an alert
#[utoipa::path(
    post,
    path = "/alert/create",
    request_body = CreateAlertRequest,
    responses(
        (status = 201, description = "Alert created successfully", body = ApiResponse<AlertResponse>),
        (status = 400, description = "Missing fields or invalid data", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "alerts"
)]
#[instrument(skip(state, auth, request), fields(user_id = auth.id()))]
pub async fn create_alert(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateAlertRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AlertResponse>>), ApiError> {
    let user_id = acting_user(&auth, request.user_id)?;

    let mut required = MissingFields::new();
    let title = required.check_text("titulo", request.title);
    let description = required.check_text("descricao", request.description);
    let alert_date = required.check("data_alerta", request.alert_date);
    let (title, description, alert_date) =
        required.finish(|| Some((title?, description?, alert_date?)))?;

    let alert = alert::ActiveModel {
        user_id: Set(user_id),
        title: Set(title),
        description: Set(description),
        alert_date: Set(alert_date),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!("Alert created successfully with ID: {} for {}", alert.id, alert.alert_date);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            AlertResponse::from(alert),
            "Alert created successfully",
        )),
    ))
}

/// Alerts of a user that fire today
#[utoipa::path(
    get,
    path = "/alert/{usuario_id}",
    params(
        ("usuario_id" = i32, Path, description = "User ID, must match the token")
    ),
    responses(
        (status = 200, description = "Alerts dated today, possibly none", body = ApiResponse<Vec<AlertResponse>>),
        (status = 401, description = "Missing or foreign token", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "alerts"
)]
#[instrument(skip(state, auth))]
pub async fn get_fired_alerts(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiPath(usuario_id): ApiPath<i32>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<AlertResponse>>>), ApiError> {
    auth.ensure_same(usuario_id)?;

    let alerts = fired_on(&state.db, usuario_id, state.compute.today()).await?;
    let message = if alerts.is_empty() {
        "No alerts fired today"
    } else {
        "Fired alerts retrieved successfully"
    };

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(
            alerts.into_iter().map(AlertResponse::from).collect(),
            message,
        )),
    ))
}

/// Alerts of the caller dated after today, soonest first
#[utoipa::path(
    get,
    path = "/alert/all",
    responses(
        (status = 200, description = "Upcoming alerts", body = ApiResponse<Vec<AlertResponse>>),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "alerts"
)]
#[instrument(skip(state, auth), fields(user_id = auth.id()))]
pub async fn get_upcoming_alerts(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<AlertResponse>>>), ApiError> {
    let alerts = upcoming(&state.db, auth.id(), state.compute.today()).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(
            alerts.into_iter().map(AlertResponse::from).collect(),
            "Upcoming alerts retrieved successfully",
        )),
    ))
}

/// Update an alert
#[utoipa::path(
    put,
    path = "/alert/update",
    request_body = UpdateAlertRequest,
    responses(
        (status = 200, description = "Alert updated successfully", body = ApiResponse<AlertResponse>),
        (status = 400, description = "Missing alert_id or invalid data", body = ErrorResponse),
        (status = 404, description = "Alert not found", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "alerts"
)]
#[instrument(skip(state, auth, request), fields(user_id = auth.id()))]
pub async fn update_alert(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<UpdateAlertRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AlertResponse>>), ApiError> {
    let user_id = acting_user(&auth, request.user_id)?;

    let mut required = MissingFields::new();
    let alert_id = required.check("alert_id", request.alert_id);
    let alert_id = required.finish(|| alert_id)?;

    let alert = alert::Entity::find_by_id(alert_id)
        .filter(alert::Column::UserId.eq(user_id))
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound("Alert"))?;

    let mut active = alert.into_active_model();
    if let Some(title) = request.title {
        active.title = Set(non_blank("titulo", title)?);
    }
    if let Some(description) = request.description {
        active.description = Set(non_blank("descricao", description)?);
    }
    if let Some(alert_date) = request.alert_date {
        debug!("Moving alert {} to {}", alert_id, alert_date);
        active.alert_date = Set(alert_date);
    }
    let alert = active.update(&state.db).await?;

    info!("Alert {} updated", alert.id);
    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(
            AlertResponse::from(alert),
            "Alert updated successfully",
        )),
    ))
}

/// Delete an alert
#[utoipa::path(
    delete,
    path = "/alert/delete/{alert_id}",
    params(
        ("alert_id" = i32, Path, description = "Alert ID")
    ),
    responses(
        (status = 200, description = "Alert deleted successfully", body = ApiResponse<i32>),
        (status = 404, description = "Alert not found", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "alerts"
)]
#[instrument(skip(state, auth), fields(user_id = auth.id()))]
pub async fn delete_alert(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiPath(alert_id): ApiPath<i32>,
) -> Result<(StatusCode, Json<ApiResponse<i32>>), ApiError> {
    let alert = alert::Entity::find_by_id(alert_id)
        .filter(alert::Column::UserId.eq(auth.id()))
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound("Alert"))?;

    alert.delete(&state.db).await?;
    info!("Alert {} deleted", alert_id);

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(alert_id, "Alert deleted successfully")),
    ))
}
