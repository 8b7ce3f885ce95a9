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
use common::DateRange;
use compute::goals::{GoalProgress, GoalSpec};
use model::entities::financial_goal::{self, GoalKind};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::ToSchema;

/// Goal definition used for creation and previews
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct GoalRequest {
    /// Defaults to the authenticated user
    #[serde(rename = "usuario_id")]
    pub user_id: Option<i32>,
    /// Required on creation, ignored by previews
    #[serde(rename = "titulo")]
    pub title: Option<String>,
    #[serde(rename = "valor_meta")]
    pub target_amount: Option<Decimal>,
    #[serde(rename = "data_inicio")]
    pub start_date: Option<NaiveDate>,
    #[serde(rename = "data_fim")]
    pub end_date: Option<NaiveDate>,
    /// `geral` (default), `categoria`, `receita` or `despesa`
    #[serde(rename = "tipo")]
    pub kind: Option<String>,
    /// Required when `tipo` is `categoria`
    #[serde(rename = "categoria_id")]
    pub category_id: Option<i32>,
}

/// Partial update of a goal; omitted fields keep their value
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdateGoalRequest {
    #[serde(rename = "meta_id")]
    pub goal_id: Option<i32>,
    #[serde(rename = "usuario_id")]
    pub user_id: Option<i32>,
    #[serde(rename = "titulo")]
    pub title: Option<String>,
    #[serde(rename = "valor_meta")]
    pub target_amount: Option<Decimal>,
    #[serde(rename = "data_inicio")]
    pub start_date: Option<NaiveDate>,
    #[serde(rename = "data_fim")]
    pub end_date: Option<NaiveDate>,
    #[serde(rename = "tipo")]
    pub kind: Option<String>,
    #[serde(rename = "categoria_id")]
    pub category_id: Option<i32>,
}

/// A stored goal with its freshly computed progress
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GoalResponse {
    pub id: i32,
    #[serde(rename = "usuario_id")]
    pub user_id: i32,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "valor_meta")]
    pub target_amount: Decimal,
    #[serde(rename = "valor_atual")]
    pub current_amount: Decimal,
    #[serde(rename = "data_inicio")]
    pub start_date: NaiveDate,
    #[serde(rename = "data_fim")]
    pub end_date: NaiveDate,
    #[serde(rename = "tipo")]
    pub kind: String,
    #[serde(rename = "categoria_id")]
    pub category_id: Option<i32>,
    #[serde(rename = "atingida")]
    pub reached: bool,
    /// Current amount as a percentage of the target
    #[serde(rename = "percentual")]
    pub percentage: Decimal,
    #[serde(rename = "criado_em")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "atualizado_em")]
    pub updated_at: DateTime<Utc>,
}

impl GoalResponse {
    fn new(goal: financial_goal::Model, progress: GoalProgress) -> Self {
        Self {
            id: goal.id,
            user_id: goal.user_id,
            title: goal.title,
            target_amount: goal.target_amount,
            current_amount: progress.current_amount,
            start_date: goal.start_date,
            end_date: goal.end_date,
            kind: goal.kind.to_string(),
            category_id: goal.category_id,
            reached: progress.reached,
            percentage: progress.percentage,
            created_at: goal.created_at,
            updated_at: goal.updated_at,
        }
    }
}

/// Valuation of a goal that was not stored
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GoalPreviewResponse {
    #[serde(rename = "tipo")]
    pub kind: String,
    #[serde(rename = "categoria_id")]
    pub category_id: Option<i32>,
    #[serde(rename = "periodo")]
    pub range: DateRange,
    #[serde(rename = "valor_meta")]
    pub target_amount: Decimal,
    #[serde(rename = "valor_atual")]
    pub current_amount: Decimal,
    #[serde(rename = "atingida")]
    pub reached: bool,
    #[serde(rename = "percentual")]
    pub percentage: Decimal,
}

fn parse_goal_kind(raw: Option<&str>) -> Result<GoalKind, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(GoalKind::General),
        Some(raw) => raw.parse().map_err(ApiError::Validation),
    }
}

fn goal_range(start: NaiveDate, end: NaiveDate) -> Result<DateRange, ApiError> {
    DateRange::new(start, end).map_err(|e| ApiError::Validation(e.to_string()))
}

/// Checks the valuation fields of `request`; `None` when one is missing.
fn goal_spec(
    user_id: i32,
    request: &GoalRequest,
    required: &mut MissingFields,
) -> Option<Result<GoalSpec, ApiError>> {
    let target = required.check("valor_meta", request.target_amount);
    let start = required.check("data_inicio", request.start_date);
    let end = required.check("data_fim", request.end_date);
    Some(build_spec(
        user_id,
        request.kind.as_deref(),
        request.category_id,
        goal_range(start?, end?),
        target?,
    ))
}

fn build_spec(
    user_id: i32,
    kind: Option<&str>,
    category_id: Option<i32>,
    range: Result<DateRange, ApiError>,
    target: Decimal,
) -> Result<GoalSpec, ApiError> {
    let kind = parse_goal_kind(kind)?;
    Ok(GoalSpec::new(user_id, kind, category_id, range?, target)?)
}

/// Create a financial goal, valued from the ledger at creation time
#[utoipa::path(
    post,
    path = "/meta_financeira/create",
    request_body = GoalRequest,
    responses(
        (status = 201, description = "Goal created with its baseline value", body = ApiResponse<GoalResponse>),
        (status = 400, description = "Missing fields or invalid data", body = ErrorResponse),
        (status = 404, description = "Category not found", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "goals"
)]
#[instrument(skip(state, auth, request), fields(user_id = auth.id()))]
pub async fn create_goal(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<GoalRequest>,
) -> Result<(StatusCode, Json<ApiResponse<GoalResponse>>), ApiError> {
    let user_id = acting_user(&auth, request.user_id)?;

    let mut required = MissingFields::new();
    let title = required.check_text("titulo", request.title.clone());
    let spec = goal_spec(user_id, &request, &mut required);
    let (title, spec) = required.finish(|| Some((title?, spec?)))?;
    let spec = spec?;

    let progress = state.compute.goals.evaluate(&state.db, &spec).await?;
    trace!("Baseline valuation: {:?}", progress);

    let now = Utc::now();
    let goal = financial_goal::ActiveModel {
        user_id: Set(user_id),
        title: Set(title),
        target_amount: Set(spec.target_amount),
        current_amount: Set(progress.current_amount),
        start_date: Set(spec.range.start),
        end_date: Set(spec.range.end),
        kind: Set(spec.kind),
        category_id: Set(spec.category_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!("Goal created successfully with ID: {}", goal.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            GoalResponse::new(goal, progress),
            "Financial goal created successfully",
        )),
    ))
}

/// Value a goal definition without storing it
#[utoipa::path(
    post,
    path = "/meta_financeira/preview",
    request_body = GoalRequest,
    responses(
        (status = 200, description = "Valuation of the goal", body = ApiResponse<GoalPreviewResponse>),
        (status = 400, description = "Missing fields or invalid data", body = ErrorResponse),
        (status = 404, description = "Category not found", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "goals"
)]
#[instrument(skip(state, auth, request), fields(user_id = auth.id()))]
pub async fn preview_goal(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<GoalRequest>,
) -> Result<(StatusCode, Json<ApiResponse<GoalPreviewResponse>>), ApiError> {
    let user_id = acting_user(&auth, request.user_id)?;

    let mut required = MissingFields::new();
    let spec = goal_spec(user_id, &request, &mut required);
    let spec = required.finish(|| spec)??;

    let progress = state.compute.goals.evaluate(&state.db, &spec).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(
            GoalPreviewResponse {
                kind: spec.kind.to_string(),
                category_id: spec.category_id,
                range: spec.range,
                target_amount: progress.target_amount,
                current_amount: progress.current_amount,
                reached: progress.reached,
                percentage: progress.percentage,
            },
            "Financial goal evaluated successfully",
        )),
    ))
}

/// Get a user's goals, each revalued from the ledger
#[utoipa::path(
    get,
    path = "/meta_financeira/{usuario_id}",
    params(
        ("usuario_id" = i32, Path, description = "User ID, must match the token")
    ),
    responses(
        (status = 200, description = "Goals with their current progress", body = ApiResponse<Vec<GoalResponse>>),
        (status = 401, description = "Missing or foreign token", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "goals"
)]
#[instrument(skip(state, auth))]
pub async fn get_goals(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiPath(usuario_id): ApiPath<i32>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<GoalResponse>>>), ApiError> {
    auth.ensure_same(usuario_id)?;

    let goals = financial_goal::Entity::find()
        .filter(financial_goal::Column::UserId.eq(usuario_id))
        .order_by_asc(financial_goal::Column::Id)
        .all(&state.db)
        .await?;
    debug!("Revaluing {} goals", goals.len());

    let mut responses = Vec::with_capacity(goals.len());
    for goal in goals {
        let (goal, progress) = state.compute.goals.refresh(&state.db, goal).await?;
        responses.push(GoalResponse::new(goal, progress));
    }

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(
            responses,
            "Financial goals retrieved successfully",
        )),
    ))
}

/// Update a goal and revalue it
#[utoipa::path(
    put,
    path = "/meta_financeira/update",
    request_body = UpdateGoalRequest,
    responses(
        (status = 200, description = "Goal updated and revalued", body = ApiResponse<GoalResponse>),
        (status = 400, description = "Missing meta_id or invalid data", body = ErrorResponse),
        (status = 404, description = "Goal or category not found", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "goals"
)]
#[instrument(skip(state, auth, request), fields(user_id = auth.id()))]
pub async fn update_goal(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<UpdateGoalRequest>,
) -> Result<(StatusCode, Json<ApiResponse<GoalResponse>>), ApiError> {
    let user_id = acting_user(&auth, request.user_id)?;

    let mut required = MissingFields::new();
    let goal_id = required.check("meta_id", request.goal_id);
    let goal_id = required.finish(|| goal_id)?;

    let goal = financial_goal::Entity::find_by_id(goal_id)
        .filter(financial_goal::Column::UserId.eq(user_id))
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound("Financial goal"))?;

    let spec = build_spec(
        user_id,
        Some(request.kind.as_deref().unwrap_or(goal.kind.as_str())),
        request.category_id.or(goal.category_id),
        goal_range(
            request.start_date.unwrap_or(goal.start_date),
            request.end_date.unwrap_or(goal.end_date),
        ),
        request.target_amount.unwrap_or(goal.target_amount),
    )?;
    // Value first so a bad category leaves the stored goal untouched
    let progress = state.compute.goals.evaluate(&state.db, &spec).await?;

    let mut active = goal.into_active_model();
    if let Some(title) = request.title {
        let title = title.trim().to_string();
        if title.is_empty() {
            return Err(ApiError::Validation("titulo must not be blank".to_string()));
        }
        active.title = Set(title);
    }
    active.target_amount = Set(spec.target_amount);
    active.current_amount = Set(progress.current_amount);
    active.start_date = Set(spec.range.start);
    active.end_date = Set(spec.range.end);
    active.kind = Set(spec.kind);
    active.category_id = Set(spec.category_id);
    active.updated_at = Set(Utc::now());
    let goal = active.update(&state.db).await?;

    info!("Goal {} updated", goal.id);

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(
            GoalResponse::new(goal, progress),
            "Financial goal updated successfully",
        )),
    ))
}

/// Delete a goal
#[utoipa::path(
    delete,
    path = "/meta_financeira/delete/{meta_id}",
    params(
        ("meta_id" = i32, Path, description = "Goal ID")
    ),
    responses(
        (status = 200, description = "Goal deleted successfully", body = ApiResponse<i32>),
        (status = 404, description = "Goal not found", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "goals"
)]
#[instrument(skip(state, auth), fields(user_id = auth.id()))]
pub async fn delete_goal(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiPath(meta_id): ApiPath<i32>,
) -> Result<(StatusCode, Json<ApiResponse<i32>>), ApiError> {
    let goal = financial_goal::Entity::find_by_id(meta_id)
        .filter(financial_goal::Column::UserId.eq(auth.id()))
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound("Financial goal"))?;

    goal.delete(&state.db).await?;
    info!("Goal {} deleted", meta_id);

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(meta_id, "Financial goal deleted successfully")),
    ))
}
