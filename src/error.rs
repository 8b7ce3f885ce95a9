//! HTTP-facing error type.
//!
//! Every failure leaves a handler as an [`ApiError`] and reaches the client as
//! an [`ErrorResponse`] JSON body with a matching status code.

use axum::{
    extract::{
        FromRequest, FromRequestParts,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_valid::ValidationRejection;
use compute::error::ComputeError;
use sea_orm::DbErr;
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::{error, warn};

use crate::schemas::ErrorResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    /// A unique value is already taken.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::MissingFields(_)
            | ApiError::Conflict(_)
            | ApiError::Database(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::MissingFields(_) => "MISSING_FIELDS",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Database(_) => "DATABASE_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }
}

impl From<ComputeError> for ApiError {
    fn from(error: ComputeError) -> Self {
        match error {
            ComputeError::Database(db_error) => ApiError::Database(db_error),
            ComputeError::Validation(message) => ApiError::Validation(message),
            ComputeError::NotFound { entity, .. } => ApiError::NotFound(entity),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl<E> From<ValidationRejection<validator::ValidationErrors, E>> for ApiError
where
    ApiError: From<E>,
{
    fn from(rejection: ValidationRejection<validator::ValidationErrors, E>) -> Self {
        match rejection {
            ValidationRejection::Valid(errors) => <ApiError as From<validator::ValidationErrors>>::from(errors),
            ValidationRejection::Inner(inner) => ApiError::from(inner),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errors)| {
                let reasons: Vec<String> = errors
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect();
                // Struct level checks have no field to name
                if field == "__all__" {
                    reasons.join(", ")
                } else {
                    format!("{}: {}", field, reasons.join(", "))
                }
            })
            .collect();
        fields.sort();
        ApiError::Validation(fields.join("; "))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Database(db_error) => error!("Request failed with database error: {}", db_error),
            ApiError::Internal(message) => error!("Request failed: {}", message),
            other => warn!("Request rejected ({}): {}", status, other),
        }

        let body = ErrorResponse {
            message: self.to_string(),
            code: self.code().to_string(),
            success: false,
        };
        (status, Json(body)).into_response()
    }
}

/// `axum::Json` whose rejections use the [`ErrorResponse`] body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `axum::extract::Path` whose rejections use the [`ErrorResponse`] body.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// `axum_valid::Valid` with the [`ErrorResponse`] body for both failed
/// validation and a rejected inner extractor.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum_valid::Valid), rejection(ApiError))]
pub struct ApiValid<T>(pub T);

/// Collects the names of absent required fields so a single error can list
/// all of them.
#[derive(Debug, Default)]
pub struct MissingFields(Vec<&'static str>);

impl MissingFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check<T>(&mut self, name: &'static str, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.0.push(name);
        }
        value
    }

    /// Like [`check`](Self::check), also treating blank text as missing.
    pub fn check_text(&mut self, name: &'static str, value: Option<String>) -> Option<String> {
        let value = value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        self.check(name, value)
    }

    /// Fails with every missing field, otherwise runs `build`.
    pub fn finish<T>(self, build: impl FnOnce() -> Option<T>) -> Result<T, ApiError> {
        if !self.0.is_empty() {
            return Err(ApiError::MissingFields(self.0));
        }
        build().ok_or_else(|| ApiError::Internal("required field vanished after check".to_string()))
    }
}

/// Deserializes a present field as `Some`, so that with `#[serde(default)]`
/// an absent field stays `None` while `null` becomes `Some(None)`.
pub fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}
