//! Monthly budgets ("orçamentos") of expense categories.
//!
//! A budget overrides the category's default monthly ceiling for one
//! `YYYY-MM` month. Listing a user's budgets reports what was spent in each
//! month and the resulting limit signal.

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiJson, ApiPath, MissingFields};
use crate::handlers::{acting_user, owned_category};
use crate::schemas::{ApiResponse, AppState};
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use common::{Month, round_money};
use model::entities::budget;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct CreateBudgetRequest {
    /// Defaults to the authenticated user
    #[serde(rename = "usuario_id")]
    pub user_id: Option<i32>,
    /// Expense category of the user
    #[serde(rename = "categoria_id")]
    pub category_id: Option<i32>,
    /// Positive ceiling for the month
    #[serde(rename = "limite")]
    pub limit: Option<Decimal>,
    /// Month as `YYYY-MM`
    #[serde(rename = "mes_ano")]
    pub month: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BudgetResponse {
    pub id: i32,
    #[serde(rename = "usuario_id")]
    pub user_id: i32,
    #[serde(rename = "categoria_id")]
    pub category_id: i32,
    #[serde(rename = "limite")]
    pub limit: Decimal,
    #[serde(rename = "mes_ano")]
    pub month: String,
    /// Spent in the category during the month
    #[serde(rename = "gasto")]
    pub spent: Decimal,
    /// `within_limit`, `near_limit` or `limit_exceeded`
    pub status: String,
    #[serde(rename = "criado_em")]
    pub created_at: DateTime<Utc>,
}

async fn budget_response(state: &AppState, budget: budget::Model) -> Result<BudgetResponse, ApiError> {
    let check = state.compute.budgets.budget_status(&state.db, &budget).await?;
    Ok(BudgetResponse {
        id: budget.id,
        user_id: budget.user_id,
        category_id: budget.category_id,
        limit: budget.limit_amount,
        month: budget.month,
        spent: check.total,
        status: check.signal.to_string(),
        created_at: budget.created_at,
    })
}

/// Create a monthly budget
#[utoipa::path(
    post,
    path = "/orcamento/create",
    request_body = CreateBudgetRequest,
    responses(
        (status = 201, description = "Budget created with the month's spending", body = ApiResponse<BudgetResponse>),
        (status = 400, description = "Missing fields, invalid data or a budget for that month already exists", body = ErrorResponse),
        (status = 404, description = "Category not found", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "budgets"
)]
#[instrument(skip(state, auth, request), fields(user_id = auth.id()))]
pub async fn create_budget(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateBudgetRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BudgetResponse>>), ApiError> {
    let user_id = acting_user(&auth, request.user_id)?;

    let mut required = MissingFields::new();
    let category_id = required.check("categoria_id", request.category_id);
    let limit = required.check("limite", request.limit);
    let month = required.check_text("mes_ano", request.month);
    let (category_id, limit, month) = required.finish(|| Some((category_id?, limit?, month?)))?;

    let month = Month::parse(&month).map_err(|e| ApiError::Validation(e.to_string()))?;
    let limit = round_money(limit);
    if limit <= Decimal::ZERO {
        return Err(ApiError::Validation("limite must be greater than zero".to_string()));
    }

    let category = owned_category(&state.db, user_id, category_id).await?;
    if !category.is_expense() {
        warn!("Budget requested for income category {}", category.id);
        return Err(ApiError::Validation(
            "Budgets only apply to expense categories".to_string(),
        ));
    }

    let existing = budget::Entity::find()
        .filter(budget::Column::CategoryId.eq(category.id))
        .filter(budget::Column::Month.eq(month.to_string()))
        .one(&state.db)
        .await?;
    if existing.is_some() {
        return Err(ApiError::Conflict(format!(
            "A budget for category {} in {} already exists",
            category.id, month
        )));
    }

    let budget = budget::ActiveModel {
        user_id: Set(user_id),
        category_id: Set(category.id),
        limit_amount: Set(limit),
        month: Set(month.to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!("Budget created successfully with ID: {}", budget.id);
    let response = budget_response(&state, budget).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(response, "Budget created successfully")),
    ))
}

/// Budgets of a user with the month's spending and signal
#[utoipa::path(
    get,
    path = "/orcamento/{usuario_id}",
    params(
        ("usuario_id" = i32, Path, description = "User ID, must match the token")
    ),
    responses(
        (status = 200, description = "Budgets, most recent month first", body = ApiResponse<Vec<BudgetResponse>>),
        (status = 401, description = "Missing or foreign token", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "budgets"
)]
#[instrument(skip(state, auth))]
pub async fn get_budgets(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiPath(usuario_id): ApiPath<i32>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<BudgetResponse>>>), ApiError> {
    auth.ensure_same(usuario_id)?;

    let budgets = budget::Entity::find()
        .filter(budget::Column::UserId.eq(usuario_id))
        .order_by_desc(budget::Column::Month)
        .order_by_asc(budget::Column::CategoryId)
        .all(&state.db)
        .await?;
    debug!("Checking {} budgets", budgets.len());

    let mut responses = Vec::with_capacity(budgets.len());
    for budget in budgets {
        responses.push(budget_response(&state, budget).await?);
    }

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(responses, "Budgets retrieved successfully")),
    ))
}

/// Delete a budget
#[utoipa::path(
    delete,
    path = "/orcamento/delete/{orcamento_id}",
    params(
        ("orcamento_id" = i32, Path, description = "Budget ID")
    ),
    responses(
        (status = 200, description = "Budget deleted successfully", body = ApiResponse<i32>),
        (status = 404, description = "Budget not found", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "budgets"
)]
#[instrument(skip(state, auth), fields(user_id = auth.id()))]
pub async fn delete_budget(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiPath(orcamento_id): ApiPath<i32>,
) -> Result<(StatusCode, Json<ApiResponse<i32>>), ApiError> {
    let budget = budget::Entity::find_by_id(orcamento_id)
        .filter(budget::Column::UserId.eq(auth.id()))
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound("Budget"))?;

    budget.delete(&state.db).await?;
    info!("Budget {} deleted", orcamento_id);

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(orcamento_id, "Budget deleted successfully")),
    ))
}
