use crate::auth::{AuthUser, Guest, SessionUser, hash_password, verify_password};
use crate::error::{ApiError, ApiJson, MissingFields};
use crate::schemas::{ApiResponse, AppState};
use axum::{extract::State, http::StatusCode, response::Json};
use chrono::Utc;
use common::is_valid_cpf;
use model::entities::user;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

/// Request body for registering a new user
#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct RegisterRequest {
    pub name: Option<String>,
    /// Must be unique
    #[validate(email(message = "must be a valid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 6, message = "must be at least 6 characters"))]
    pub password: Option<String>,
    /// 11 digits, no punctuation. Must be unique
    pub cpf: Option<String>,
}

/// Request body for logging in
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// User response model
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub cpf: String,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            cpf: model.cpf,
        }
    }
}

impl From<SessionUser> for UserResponse {
    fn from(session: SessionUser) -> Self {
        Self {
            id: session.id,
            name: session.name,
            email: session.email,
            cpf: session.cpf,
        }
    }
}

/// Session token issued at login
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/user/register",
    tag = "users",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid data, email or CPF already in use, or already authenticated", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request), fields(email = ?request.email))]
pub async fn register(
    _guest: Guest,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ApiError> {
    trace!("Entering register function");
    request.validate()?;

    let mut required = MissingFields::new();
    let name = required.check_text("name", request.name);
    let email = required.check_text("email", request.email);
    let password = required.check("password", request.password);
    let cpf = required.check_text("cpf", request.cpf);
    let (name, email, password, cpf) = required.finish(|| Some((name?, email?, password?, cpf?)))?;

    if !is_valid_cpf(&cpf) {
        warn!("Registration rejected: invalid CPF");
        return Err(ApiError::Validation("Invalid CPF".to_string()));
    }

    debug!("Checking email and CPF uniqueness");
    if user::Entity::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .one(&state.db)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("Email already in use".to_string()));
    }
    if user::Entity::find()
        .filter(user::Column::Cpf.eq(cpf.as_str()))
        .one(&state.db)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("CPF already in use".to_string()));
    }

    let password_hash = hash_password(password, state.settings.password_cost).await?;

    let user_model = user::ActiveModel {
        name: Set(name),
        email: Set(email),
        cpf: Set(cpf),
        password_hash: Set(password_hash),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!("User registered with ID: {}", user_model.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            UserResponse::from(user_model),
            "User registered successfully",
        )),
    ))
}

/// Log in and receive a session token
#[utoipa::path(
    post,
    path = "/user/login",
    tag = "users",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = ApiResponse<LoginResponse>),
        (status = 400, description = "Missing fields or already authenticated", body = ErrorResponse),
        (status = 401, description = "Email or password incorrect", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request), fields(email = ?request.email))]
pub async fn login(
    _guest: Guest,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<(StatusCode, Json<ApiResponse<LoginResponse>>), ApiError> {
    trace!("Entering login function");

    let mut required = MissingFields::new();
    let email = required.check_text("email", request.email);
    let password = required.check("password", request.password);
    let (email, password) = required.finish(|| Some((email?, password?)))?;

    let incorrect = || ApiError::unauthorized("Email or password incorrect");

    let user_model = user::Entity::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .one(&state.db)
        .await?
        .ok_or_else(|| {
            debug!("Login for unknown email");
            incorrect()
        })?;

    if !verify_password(password, user_model.password_hash.clone()).await {
        warn!("Wrong password for user {}", user_model.id);
        return Err(incorrect());
    }

    let token = state.auth.issue(user_model.id, &user_model.email)?;
    info!("User {} logged in", user_model.id);

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(
            LoginResponse {
                token,
                user: UserResponse::from(user_model),
            },
            "Login successful",
        )),
    ))
}

/// The authenticated user
#[utoipa::path(
    get,
    path = "/user/me",
    tag = "users",
    responses(
        (status = 200, description = "Current user", body = ApiResponse<UserResponse>),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[instrument(skip(auth), fields(user_id = auth.id()))]
pub async fn me(auth: AuthUser) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ApiError> {
    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(
            UserResponse::from(auth.0),
            "User retrieved successfully",
        )),
    ))
}
