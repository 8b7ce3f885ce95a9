//! Income ("receita") and expense ("despesa") entries.
//!
//! Both kinds share the same shape and routes; an entry may only be filed
//! under a category of its own kind. Creating an expense also runs the
//! category's limit checks and reports the resulting signals.

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiJson, ApiPath, ApiValid, MissingFields};
use crate::handlers::categories::CategoryResponse;
use crate::handlers::{acting_user, owned_category};
use crate::schemas::{ApiResponse, AppState, PeriodQuery};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use common::{DateRange, round_money};
use compute::budget::{LimitCheck, LimitScope, most_severe};
use compute::ledger::{self, CategoryTotal, LedgerFilter, category_totals};
use model::entities::category::{self, CategoryType};
use model::entities::{expense, income};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

/// Request structure for recording an expense
#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateExpenseRequest {
    /// Defaults to the authenticated user
    #[serde(rename = "usuario_id")]
    pub user_id: Option<i32>,
    /// Must be an expense category of the user
    #[serde(rename = "categoria_id")]
    pub category_id: Option<i32>,
    /// Positive amount, rounded to cents
    #[serde(rename = "valor")]
    pub amount: Option<Decimal>,
    #[serde(rename = "data")]
    pub date: Option<NaiveDate>,
    #[serde(rename = "descricao")]
    pub description: Option<String>,
    /// Reference to a receipt image
    #[serde(rename = "imagem")]
    pub image: Option<String>,
    #[validate(range(min = -90.0, max = 90.0, message = "must be between -90 and 90"))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0, message = "must be between -180 and 180"))]
    pub longitude: Option<f64>,
}

/// Request structure for recording an income
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct CreateIncomeRequest {
    /// Defaults to the authenticated user
    #[serde(rename = "usuario_id")]
    pub user_id: Option<i32>,
    /// Must be an income category of the user
    #[serde(rename = "categoria_id")]
    pub category_id: Option<i32>,
    #[serde(rename = "valor")]
    pub amount: Option<Decimal>,
    #[serde(rename = "data")]
    pub date: Option<NaiveDate>,
    #[serde(rename = "descricao")]
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ExpenseResponse {
    pub id: i32,
    #[serde(rename = "usuario_id")]
    pub user_id: i32,
    #[serde(rename = "categoria_id")]
    pub category_id: i32,
    #[serde(rename = "valor")]
    pub amount: Decimal,
    #[serde(rename = "data")]
    pub date: NaiveDate,
    #[serde(rename = "descricao")]
    pub description: String,
    #[serde(rename = "imagem")]
    pub image: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(rename = "criado_em")]
    pub created_at: DateTime<Utc>,
}

impl From<expense::Model> for ExpenseResponse {
    fn from(model: expense::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            category_id: model.category_id,
            amount: model.amount,
            date: model.date,
            description: model.description,
            image: model.image,
            latitude: model.latitude,
            longitude: model.longitude,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IncomeResponse {
    pub id: i32,
    #[serde(rename = "usuario_id")]
    pub user_id: i32,
    #[serde(rename = "categoria_id")]
    pub category_id: i32,
    #[serde(rename = "valor")]
    pub amount: Decimal,
    #[serde(rename = "data")]
    pub date: NaiveDate,
    #[serde(rename = "descricao")]
    pub description: String,
    #[serde(rename = "criado_em")]
    pub created_at: DateTime<Utc>,
}

impl From<income::Model> for IncomeResponse {
    fn from(model: income::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            category_id: model.category_id,
            amount: model.amount,
            date: model.date,
            description: model.description,
            created_at: model.created_at,
        }
    }
}

/// One ceiling of the expense's category compared with its spending
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LimitCheckResponse {
    /// `total` for the all-time limit, otherwise the month (`YYYY-MM`)
    #[serde(rename = "escopo")]
    pub scope: String,
    #[serde(rename = "gasto")]
    pub total: Decimal,
    #[serde(rename = "limite")]
    pub ceiling: Decimal,
    /// `within_limit`, `near_limit` or `limit_exceeded`
    #[serde(rename = "sinal")]
    pub signal: String,
}

impl From<LimitCheck> for LimitCheckResponse {
    fn from(check: LimitCheck) -> Self {
        let scope = match check.scope {
            LimitScope::AllTime => "total".to_string(),
            LimitScope::Month(month) => month.to_string(),
        };
        Self {
            scope,
            total: check.total,
            ceiling: check.ceiling,
            signal: check.signal.to_string(),
        }
    }
}

/// A newly recorded expense and the limit checks it triggered
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ExpenseCreatedResponse {
    #[serde(rename = "despesa")]
    pub expense: ExpenseResponse,
    #[serde(rename = "limites")]
    pub checks: Vec<LimitCheckResponse>,
    /// Most severe signal among `limites`
    #[serde(rename = "sinal")]
    pub signal: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TotalResponse {
    #[serde(rename = "usuario_id")]
    pub user_id: i32,
    pub total: Decimal,
    /// Present when the total is limited to a date range
    #[serde(rename = "periodo")]
    pub range: Option<DateRange>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoryTotalEntry {
    #[serde(rename = "categoria")]
    pub category: CategoryResponse,
    pub total: Decimal,
}

impl From<CategoryTotal> for CategoryTotalEntry {
    fn from(entry: CategoryTotal) -> Self {
        Self {
            category: CategoryResponse::from(entry.category),
            total: entry.total,
        }
    }
}

fn positive_amount(amount: Decimal) -> Result<Decimal, ApiError> {
    let amount = round_money(amount);
    if amount <= Decimal::ZERO {
        return Err(ApiError::Validation(
            "valor must be greater than zero".to_string(),
        ));
    }
    Ok(amount)
}

/// The user's category `category_id`, which must be of `kind`.
async fn category_of_kind(
    state: &AppState,
    user_id: i32,
    category_id: i32,
    kind: CategoryType,
) -> Result<category::Model, ApiError> {
    let category = owned_category(&state.db, user_id, category_id).await?;
    if category.kind != kind {
        warn!(
            "Category {} is {}, expected {}",
            category.id, category.kind, kind
        );
        return Err(ApiError::Validation(format!(
            "Category {} is not a '{}' category",
            category.id, kind
        )));
    }
    Ok(category)
}

/// Record an expense and check the category's limits
#[utoipa::path(
    post,
    path = "/despesa/create",
    request_body = CreateExpenseRequest,
    responses(
        (status = 201, description = "Expense created with the limit checks it triggered", body = ApiResponse<ExpenseCreatedResponse>),
        (status = 400, description = "Missing fields, invalid data or wrong category type", body = ErrorResponse),
        (status = 404, description = "Category not found", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "expenses"
)]
#[instrument(skip(state, auth, request), fields(user_id = auth.id()))]
pub async fn create_expense(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateExpenseRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ExpenseCreatedResponse>>), ApiError> {
    let user_id = acting_user(&auth, request.user_id)?;
    request.validate()?;

    let mut required = MissingFields::new();
    let category_id = required.check("categoria_id", request.category_id);
    let amount = required.check("valor", request.amount);
    let date = required.check("data", request.date);
    let description = required.check_text("descricao", request.description);
    let (category_id, amount, date, description) =
        required.finish(|| Some((category_id?, amount?, date?, description?)))?;
    let amount = positive_amount(amount)?;

    let category = category_of_kind(&state, user_id, category_id, CategoryType::Expense).await?;

    // The expense is only kept if its limit checks could run
    let txn = state.db.begin().await?;
    let expense = expense::ActiveModel {
        user_id: Set(user_id),
        category_id: Set(category.id),
        amount: Set(amount),
        date: Set(date),
        description: Set(description),
        image: Set(request.image),
        latitude: Set(request.latitude),
        longitude: Set(request.longitude),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let checks = state
        .compute
        .budgets
        .check_category(&txn, &category, expense.date)
        .await?;
    txn.commit().await?;
    info!("Expense created successfully with ID: {}", expense.id);
    let signal = most_severe(&checks);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            ExpenseCreatedResponse {
                expense: ExpenseResponse::from(expense),
                checks: checks.into_iter().map(LimitCheckResponse::from).collect(),
                signal: signal.to_string(),
            },
            "Expense created successfully",
        )),
    ))
}

/// Get all expenses of a user
#[utoipa::path(
    get,
    path = "/despesa/{usuario_id}",
    params(
        ("usuario_id" = i32, Path, description = "User ID, must match the token")
    ),
    responses(
        (status = 200, description = "Expenses of the user, oldest first", body = ApiResponse<Vec<ExpenseResponse>>),
        (status = 401, description = "Missing or foreign token", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "expenses"
)]
#[instrument(skip(state, auth))]
pub async fn get_expenses(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiPath(usuario_id): ApiPath<i32>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<ExpenseResponse>>>), ApiError> {
    auth.ensure_same(usuario_id)?;

    let expenses = expense::Entity::find()
        .filter(expense::Column::UserId.eq(usuario_id))
        .order_by_asc(expense::Column::Date)
        .order_by_asc(expense::Column::Id)
        .all(&state.db)
        .await?;

    debug!("Retrieved {} expenses", expenses.len());
    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(
            expenses.into_iter().map(ExpenseResponse::from).collect(),
            "Expenses retrieved successfully",
        )),
    ))
}

/// Delete an expense
#[utoipa::path(
    delete,
    path = "/despesa/delete/{despesa_id}",
    params(
        ("despesa_id" = i32, Path, description = "Expense ID")
    ),
    responses(
        (status = 200, description = "Expense deleted successfully", body = ApiResponse<ExpenseResponse>),
        (status = 404, description = "Expense not found", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "expenses"
)]
#[instrument(skip(state, auth), fields(user_id = auth.id()))]
pub async fn delete_expense(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiPath(despesa_id): ApiPath<i32>,
) -> Result<(StatusCode, Json<ApiResponse<ExpenseResponse>>), ApiError> {
    let expense = expense::Entity::find_by_id(despesa_id)
        .filter(expense::Column::UserId.eq(auth.id()))
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound("Expense"))?;

    expense.clone().delete(&state.db).await?;
    info!("Expense {} deleted", despesa_id);

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(
            ExpenseResponse::from(expense),
            "Expense deleted successfully",
        )),
    ))
}

/// Total expense of a user
#[utoipa::path(
    get,
    path = "/despesa/total/{usuario_id}",
    params(
        ("usuario_id" = i32, Path, description = "User ID, must match the token"),
        PeriodQuery
    ),
    responses(
        (status = 200, description = "Sum of the user's expenses, zero when there are none", body = ApiResponse<TotalResponse>),
        (status = 400, description = "Invalid date range"),
        (status = 401, description = "Missing or foreign token", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "expenses"
)]
#[instrument(skip(state, auth))]
pub async fn get_expense_total(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiPath(usuario_id): ApiPath<i32>,
    ApiValid(Query(period)): ApiValid<Query<PeriodQuery>>,
) -> Result<(StatusCode, Json<ApiResponse<TotalResponse>>), ApiError> {
    auth.ensure_same(usuario_id)?;
    let range = period.range()?;

    let total = ledger::expense_total(&state.db, &LedgerFilter::user(usuario_id).within(range)).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(
            TotalResponse {
                user_id: usuario_id,
                total,
                range,
            },
            "Expense total retrieved successfully",
        )),
    ))
}

/// Expense categories of a user with their totals
#[utoipa::path(
    get,
    path = "/despesa/categorias/{usuario_id}",
    params(
        ("usuario_id" = i32, Path, description = "User ID, must match the token")
    ),
    responses(
        (status = 200, description = "Expense categories with their all-time totals", body = ApiResponse<Vec<CategoryTotalEntry>>),
        (status = 401, description = "Missing or foreign token", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "expenses"
)]
#[instrument(skip(state, auth))]
pub async fn get_expense_categories(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiPath(usuario_id): ApiPath<i32>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<CategoryTotalEntry>>>), ApiError> {
    auth.ensure_same(usuario_id)?;
    let totals = category_totals(&state.db, usuario_id, CategoryType::Expense).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(
            totals.into_iter().map(CategoryTotalEntry::from).collect(),
            "Expense categories retrieved successfully",
        )),
    ))
}

/// Expenses filed under one category
#[utoipa::path(
    get,
    path = "/despesa/por-categoria/{categoria_id}",
    params(
        ("categoria_id" = i32, Path, description = "Expense category ID")
    ),
    responses(
        (status = 200, description = "Expenses of the category, oldest first", body = ApiResponse<Vec<ExpenseResponse>>),
        (status = 400, description = "Not an expense category", body = ErrorResponse),
        (status = 404, description = "Category not found", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "expenses"
)]
#[instrument(skip(state, auth), fields(user_id = auth.id()))]
pub async fn get_expenses_by_category(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiPath(categoria_id): ApiPath<i32>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<ExpenseResponse>>>), ApiError> {
    let category = category_of_kind(&state, auth.id(), categoria_id, CategoryType::Expense).await?;

    let expenses = expense::Entity::find()
        .filter(expense::Column::CategoryId.eq(category.id))
        .order_by_asc(expense::Column::Date)
        .order_by_asc(expense::Column::Id)
        .all(&state.db)
        .await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(
            expenses.into_iter().map(ExpenseResponse::from).collect(),
            "Expenses retrieved successfully",
        )),
    ))
}

/// Record an income
#[utoipa::path(
    post,
    path = "/receita/create",
    request_body = CreateIncomeRequest,
    responses(
        (status = 201, description = "Income created successfully", body = ApiResponse<IncomeResponse>),
        (status = 400, description = "Missing fields, invalid data or wrong category type", body = ErrorResponse),
        (status = 404, description = "Category not found", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "incomes"
)]
#[instrument(skip(state, auth, request), fields(user_id = auth.id()))]
pub async fn create_income(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateIncomeRequest>,
) -> Result<(StatusCode, Json<ApiResponse<IncomeResponse>>), ApiError> {
    let user_id = acting_user(&auth, request.user_id)?;

    let mut required = MissingFields::new();
    let category_id = required.check("categoria_id", request.category_id);
    let amount = required.check("valor", request.amount);
    let date = required.check("data", request.date);
    let description = required.check_text("descricao", request.description);
    let (category_id, amount, date, description) =
        required.finish(|| Some((category_id?, amount?, date?, description?)))?;
    let amount = positive_amount(amount)?;

    let category = category_of_kind(&state, user_id, category_id, CategoryType::Income).await?;

    let income = income::ActiveModel {
        user_id: Set(user_id),
        category_id: Set(category.id),
        amount: Set(amount),
        date: Set(date),
        description: Set(description),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!("Income created successfully with ID: {}", income.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            IncomeResponse::from(income),
            "Income created successfully",
        )),
    ))
}

/// Get all incomes of a user
#[utoipa::path(
    get,
    path = "/receita/{usuario_id}",
    params(
        ("usuario_id" = i32, Path, description = "User ID, must match the token")
    ),
    responses(
        (status = 200, description = "Incomes of the user, oldest first", body = ApiResponse<Vec<IncomeResponse>>),
        (status = 401, description = "Missing or foreign token", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "incomes"
)]
#[instrument(skip(state, auth))]
pub async fn get_incomes(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiPath(usuario_id): ApiPath<i32>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<IncomeResponse>>>), ApiError> {
    auth.ensure_same(usuario_id)?;

    let incomes = income::Entity::find()
        .filter(income::Column::UserId.eq(usuario_id))
        .order_by_asc(income::Column::Date)
        .order_by_asc(income::Column::Id)
        .all(&state.db)
        .await?;

    debug!("Retrieved {} incomes", incomes.len());
    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(
            incomes.into_iter().map(IncomeResponse::from).collect(),
            "Incomes retrieved successfully",
        )),
    ))
}

/// Delete an income
#[utoipa::path(
    delete,
    path = "/receita/delete/{receita_id}",
    params(
        ("receita_id" = i32, Path, description = "Income ID")
    ),
    responses(
        (status = 200, description = "Income deleted successfully", body = ApiResponse<IncomeResponse>),
        (status = 404, description = "Income not found", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "incomes"
)]
#[instrument(skip(state, auth), fields(user_id = auth.id()))]
pub async fn delete_income(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiPath(receita_id): ApiPath<i32>,
) -> Result<(StatusCode, Json<ApiResponse<IncomeResponse>>), ApiError> {
    let income = income::Entity::find_by_id(receita_id)
        .filter(income::Column::UserId.eq(auth.id()))
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound("Income"))?;

    income.clone().delete(&state.db).await?;
    info!("Income {} deleted", receita_id);

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(
            IncomeResponse::from(income),
            "Income deleted successfully",
        )),
    ))
}

/// Total income of a user
#[utoipa::path(
    get,
    path = "/receita/total/{usuario_id}",
    params(
        ("usuario_id" = i32, Path, description = "User ID, must match the token"),
        PeriodQuery
    ),
    responses(
        (status = 200, description = "Sum of the user's incomes, zero when there are none", body = ApiResponse<TotalResponse>),
        (status = 400, description = "Invalid date range"),
        (status = 401, description = "Missing or foreign token", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "incomes"
)]
#[instrument(skip(state, auth))]
pub async fn get_income_total(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiPath(usuario_id): ApiPath<i32>,
    ApiValid(Query(period)): ApiValid<Query<PeriodQuery>>,
) -> Result<(StatusCode, Json<ApiResponse<TotalResponse>>), ApiError> {
    auth.ensure_same(usuario_id)?;
    let range = period.range()?;

    let total = ledger::income_total(&state.db, &LedgerFilter::user(usuario_id).within(range)).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(
            TotalResponse {
                user_id: usuario_id,
                total,
                range,
            },
            "Income total retrieved successfully",
        )),
    ))
}

/// Income categories of a user with their totals
#[utoipa::path(
    get,
    path = "/receita/categorias/{usuario_id}",
    params(
        ("usuario_id" = i32, Path, description = "User ID, must match the token")
    ),
    responses(
        (status = 200, description = "Income categories with their all-time totals", body = ApiResponse<Vec<CategoryTotalEntry>>),
        (status = 401, description = "Missing or foreign token", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "incomes"
)]
#[instrument(skip(state, auth))]
pub async fn get_income_categories(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiPath(usuario_id): ApiPath<i32>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<CategoryTotalEntry>>>), ApiError> {
    auth.ensure_same(usuario_id)?;
    let totals = category_totals(&state.db, usuario_id, CategoryType::Income).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(
            totals.into_iter().map(CategoryTotalEntry::from).collect(),
            "Income categories retrieved successfully",
        )),
    ))
}

/// Incomes filed under one category
#[utoipa::path(
    get,
    path = "/receita/por-categoria/{categoria_id}",
    params(
        ("categoria_id" = i32, Path, description = "Income category ID")
    ),
    responses(
        (status = 200, description = "Incomes of the category, oldest first", body = ApiResponse<Vec<IncomeResponse>>),
        (status = 400, description = "Not an income category", body = ErrorResponse),
        (status = 404, description = "Category not found", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "incomes"
)]
#[instrument(skip(state, auth), fields(user_id = auth.id()))]
pub async fn get_incomes_by_category(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiPath(categoria_id): ApiPath<i32>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<IncomeResponse>>>), ApiError> {
    let category = category_of_kind(&state, auth.id(), categoria_id, CategoryType::Income).await?;

    let incomes = income::Entity::find()
        .filter(income::Column::CategoryId.eq(category.id))
        .order_by_asc(income::Column::Date)
        .order_by_asc(income::Column::Id)
        .all(&state.db)
        .await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(
            incomes.into_iter().map(IncomeResponse::from).collect(),
            "Incomes retrieved successfully",
        )),
    ))
}
