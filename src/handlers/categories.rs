use crate::auth::AuthUser;
use crate::error::{ApiError, ApiJson, ApiPath, ApiValid, MissingFields, deserialize_some};
use crate::handlers::{acting_user, owned_category};
use crate::schemas::{ApiResponse, AppState, PeriodQuery};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use compute::categories::{self as service, CategoryChanges, CategoryDeletion, NewCategory};
use compute::ledger::category_total;
use model::entities::category::{self, CategoryType};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

/// Request structure for creating a new category
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct CreateCategoryRequest {
    /// Defaults to the authenticated user
    #[serde(rename = "usuario_id")]
    pub user_id: Option<i32>,
    #[serde(rename = "nome")]
    pub name: Option<String>,
    /// `receita` or `despesa`
    #[serde(rename = "tipo")]
    pub kind: Option<String>,
    /// All-time spending ceiling, expense categories only
    #[serde(rename = "limite_gasto")]
    pub spending_limit: Option<Decimal>,
    /// Default ceiling for each month, expense categories only
    #[serde(rename = "orcamento_mensal")]
    pub monthly_budget: Option<Decimal>,
}

/// Partial update of a category.
///
/// Omitted fields stay unchanged; `null` clears a ceiling. Changing `tipo`
/// converts every linked entry to the new kind.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdateCategoryRequest {
    #[serde(rename = "nome")]
    pub name: Option<String>,
    #[serde(rename = "tipo")]
    pub kind: Option<String>,
    #[serde(
        rename = "limite_gasto",
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>)]
    pub spending_limit: Option<Option<Decimal>>,
    #[serde(
        rename = "orcamento_mensal",
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>)]
    pub monthly_budget: Option<Option<Decimal>>,
}

/// Response structure for category operations
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponse {
    pub id: i32,
    #[serde(rename = "usuario_id")]
    pub user_id: i32,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "tipo")]
    pub kind: String,
    #[serde(rename = "limite_gasto")]
    pub spending_limit: Option<Decimal>,
    #[serde(rename = "orcamento_mensal")]
    pub monthly_budget: Option<Decimal>,
    #[serde(rename = "criado_em")]
    pub created_at: DateTime<Utc>,
}

impl From<category::Model> for CategoryResponse {
    fn from(model: category::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            name: model.name,
            kind: model.kind.to_string(),
            spending_limit: model.spending_limit,
            monthly_budget: model.monthly_budget,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoryUpdateResponse {
    #[serde(rename = "categoria")]
    pub category: CategoryResponse,
    /// Entries recreated under the new kind
    #[serde(rename = "entradas_convertidas")]
    pub converted_entries: usize,
}

/// Rows removed together with a category
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoryDeletionResponse {
    #[serde(rename = "receitas")]
    pub incomes: u64,
    #[serde(rename = "despesas")]
    pub expenses: u64,
    #[serde(rename = "orcamentos")]
    pub budgets: u64,
    #[serde(rename = "metas")]
    pub goals: u64,
}

impl From<CategoryDeletion> for CategoryDeletionResponse {
    fn from(deletion: CategoryDeletion) -> Self {
        Self {
            incomes: deletion.incomes,
            expenses: deletion.expenses,
            budgets: deletion.budgets,
            goals: deletion.goals,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoryTotalResponse {
    #[serde(rename = "categoria_id")]
    pub category_id: i32,
    #[serde(rename = "tipo")]
    pub kind: String,
    pub total: Decimal,
}

pub(crate) fn parse_kind(raw: &str) -> Result<CategoryType, ApiError> {
    raw.trim().parse().map_err(ApiError::Validation)
}

/// Create a new category
#[utoipa::path(
    post,
    path = "/categoria/create",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created successfully", body = ApiResponse<CategoryResponse>),
        (status = 400, description = "Missing fields or invalid data", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "categories"
)]
#[instrument(skip(state, auth), fields(user_id = auth.id()))]
pub async fn create_category(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CategoryResponse>>), ApiError> {
    let user_id = acting_user(&auth, request.user_id)?;

    let mut required = MissingFields::new();
    let name = required.check_text("nome", request.name);
    let kind = required.check_text("tipo", request.kind);
    let (name, kind) = required.finish(|| Some((name?, kind?)))?;
    let kind = parse_kind(&kind)?;

    debug!("Creating {} category '{}'", kind, name);
    let category = service::create_category(
        &state.db,
        user_id,
        NewCategory {
            name,
            kind,
            spending_limit: request.spending_limit,
            monthly_budget: request.monthly_budget,
        },
    )
    .await?;

    info!("Category created successfully with ID: {}", category.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            CategoryResponse::from(category),
            "Category created successfully",
        )),
    ))
}

/// Get all categories of a user
#[utoipa::path(
    get,
    path = "/categoria/{usuario_id}",
    params(
        ("usuario_id" = i32, Path, description = "User ID, must match the token")
    ),
    responses(
        (status = 200, description = "Categories of the user", body = ApiResponse<Vec<CategoryResponse>>),
        (status = 401, description = "Missing or foreign token", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "categories"
)]
#[instrument(skip(state, auth))]
pub async fn get_categories(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiPath(usuario_id): ApiPath<i32>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<CategoryResponse>>>), ApiError> {
    auth.ensure_same(usuario_id)?;

    let categories = category::Entity::find()
        .filter(category::Column::UserId.eq(usuario_id))
        .order_by_asc(category::Column::Id)
        .all(&state.db)
        .await?;

    info!("Retrieved {} categories", categories.len());
    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(
            categories.into_iter().map(CategoryResponse::from).collect(),
            "Categories retrieved successfully",
        )),
    ))
}

/// Update a category
#[utoipa::path(
    put,
    path = "/categoria/update/{categoria_id}",
    params(
        ("categoria_id" = i32, Path, description = "Category ID")
    ),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Category updated, entries converted when the type changed", body = ApiResponse<CategoryUpdateResponse>),
        (status = 400, description = "Invalid data", body = ErrorResponse),
        (status = 404, description = "Category not found", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "categories"
)]
#[instrument(skip(state, auth), fields(user_id = auth.id()))]
pub async fn update_category(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiPath(categoria_id): ApiPath<i32>,
    ApiJson(request): ApiJson<UpdateCategoryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CategoryUpdateResponse>>), ApiError> {
    let kind = request.kind.as_deref().map(parse_kind).transpose()?;

    let update = service::update_category(
        &state.db,
        auth.id(),
        categoria_id,
        CategoryChanges {
            name: request.name,
            kind,
            spending_limit: request.spending_limit,
            monthly_budget: request.monthly_budget,
        },
    )
    .await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(
            CategoryUpdateResponse {
                category: CategoryResponse::from(update.category),
                converted_entries: update.converted_entries,
            },
            "Category updated successfully",
        )),
    ))
}

/// Delete a category with its entries, budgets and bound goals
#[utoipa::path(
    delete,
    path = "/categoria/delete/{categoria_id}",
    params(
        ("categoria_id" = i32, Path, description = "Category ID")
    ),
    responses(
        (status = 200, description = "Category deleted successfully", body = ApiResponse<CategoryDeletionResponse>),
        (status = 404, description = "Category not found", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "categories"
)]
#[instrument(skip(state, auth), fields(user_id = auth.id()))]
pub async fn delete_category(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiPath(categoria_id): ApiPath<i32>,
) -> Result<(StatusCode, Json<ApiResponse<CategoryDeletionResponse>>), ApiError> {
    let deletion = service::delete_category(&state.db, auth.id(), categoria_id).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(
            CategoryDeletionResponse::from(deletion),
            "Category deleted successfully",
        )),
    ))
}

/// Total of a category's entries
#[utoipa::path(
    get,
    path = "/categoria/total/{categoria_id}",
    params(
        ("categoria_id" = i32, Path, description = "Category ID"),
        PeriodQuery
    ),
    responses(
        (status = 200, description = "Category total", body = ApiResponse<CategoryTotalResponse>),
        (status = 400, description = "Invalid date range"),
        (status = 404, description = "Category not found", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "categories"
)]
#[instrument(skip(state, auth), fields(user_id = auth.id()))]
pub async fn get_category_total(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiPath(categoria_id): ApiPath<i32>,
    ApiValid(Query(period)): ApiValid<Query<PeriodQuery>>,
) -> Result<(StatusCode, Json<ApiResponse<CategoryTotalResponse>>), ApiError> {
    let category = owned_category(&state.db, auth.id(), categoria_id).await?;
    let total = category_total(&state.db, &category, period.range()?).await?;

    debug!("Category {} total: {}", category.id, total);
    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(
            CategoryTotalResponse {
                category_id: category.id,
                kind: category.kind.to_string(),
                total,
            },
            "Category total retrieved successfully",
        )),
    ))
}
