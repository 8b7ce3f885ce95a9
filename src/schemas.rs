use crate::auth::SessionUser;
use crate::config::Settings;
use crate::error::ApiError;
use crate::handlers::{alerts, budgets, categories, entries, goals, users};
use chrono::NaiveDate;
use common::DateRange;
use compute::ComputeServices;
use moka::future::Cache;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{
    IntoParams, Modify, OpenApi, ToSchema,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use validator::{Validate, ValidationError};

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Users behind recently verified tokens, keyed by user id
    pub cache: Cache<i32, SessionUser>,
    pub settings: Arc<Settings>,
    /// Session token keys
    pub auth: crate::auth::AuthKeys,
    /// Goal valuation and budget checks
    pub compute: ComputeServices,
}

/// Optional inclusive date range for totals
#[derive(Debug, Default, Clone, Deserialize, Serialize, IntoParams, Validate)]
#[validate(schema(function = "validate_period"))]
pub struct PeriodQuery {
    /// First day (YYYY-MM-DD), given together with `fim`
    pub inicio: Option<NaiveDate>,
    /// Last day (YYYY-MM-DD), given together with `inicio`
    pub fim: Option<NaiveDate>,
}

fn validate_period(query: &PeriodQuery) -> Result<(), ValidationError> {
    match (query.inicio, query.fim) {
        (Some(start), Some(end)) if start > end => {
            Err(ValidationError::new("inverted_range")
                .with_message("inicio must not be after fim".into()))
        }
        (Some(_), None) | (None, Some(_)) => {
            Err(ValidationError::new("incomplete_range")
                .with_message("inicio and fim must be given together".into()))
        }
        _ => Ok(()),
    }
}

impl PeriodQuery {
    /// The requested range, `None` when no bounds were given.
    pub fn range(&self) -> Result<Option<DateRange>, ApiError> {
        match (self.inicio, self.fim) {
            (Some(start), Some(end)) => DateRange::new(start, end)
                .map(Some)
                .map_err(|e| ApiError::Validation(e.to_string())),
            (None, None) => Ok(None),
            _ => Err(ApiError::Validation(
                "inicio and fim must be given together".to_string(),
            )),
        }
    }
}

/// API response wrapper
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success status
    pub success: bool,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: message.into(),
            success: true,
        }
    }
}

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Human readable error message
    pub message: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
}

/// Health check response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::users::register,
        crate::handlers::users::login,
        crate::handlers::users::me,
        crate::handlers::categories::create_category,
        crate::handlers::categories::get_categories,
        crate::handlers::categories::update_category,
        crate::handlers::categories::delete_category,
        crate::handlers::categories::get_category_total,
        crate::handlers::entries::create_expense,
        crate::handlers::entries::get_expenses,
        crate::handlers::entries::delete_expense,
        crate::handlers::entries::get_expense_total,
        crate::handlers::entries::get_expense_categories,
        crate::handlers::entries::get_expenses_by_category,
        crate::handlers::entries::create_income,
        crate::handlers::entries::get_incomes,
        crate::handlers::entries::delete_income,
        crate::handlers::entries::get_income_total,
        crate::handlers::entries::get_income_categories,
        crate::handlers::entries::get_incomes_by_category,
        crate::handlers::goals::create_goal,
        crate::handlers::goals::preview_goal,
        crate::handlers::goals::get_goals,
        crate::handlers::goals::update_goal,
        crate::handlers::goals::delete_goal,
        crate::handlers::alerts::create_alert,
        crate::handlers::alerts::get_fired_alerts,
        crate::handlers::alerts::get_upcoming_alerts,
        crate::handlers::alerts::update_alert,
        crate::handlers::alerts::delete_alert,
        crate::handlers::budgets::create_budget,
        crate::handlers::budgets::get_budgets,
        crate::handlers::budgets::delete_budget,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            DateRange,
            users::RegisterRequest,
            users::LoginRequest,
            users::UserResponse,
            users::LoginResponse,
            categories::CreateCategoryRequest,
            categories::UpdateCategoryRequest,
            categories::CategoryResponse,
            categories::CategoryUpdateResponse,
            categories::CategoryDeletionResponse,
            categories::CategoryTotalResponse,
            entries::CreateExpenseRequest,
            entries::CreateIncomeRequest,
            entries::ExpenseResponse,
            entries::IncomeResponse,
            entries::ExpenseCreatedResponse,
            entries::LimitCheckResponse,
            entries::TotalResponse,
            entries::CategoryTotalEntry,
            goals::GoalRequest,
            goals::UpdateGoalRequest,
            goals::GoalResponse,
            goals::GoalPreviewResponse,
            alerts::CreateAlertRequest,
            alerts::UpdateAlertRequest,
            alerts::AlertResponse,
            budgets::CreateBudgetRequest,
            budgets::BudgetResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "users", description = "Registration, login and the current user"),
        (name = "categories", description = "Income and expense categories"),
        (name = "expenses", description = "Expense entries, totals and limit checks"),
        (name = "incomes", description = "Income entries and totals"),
        (name = "goals", description = "Financial goals and their valuation"),
        (name = "alerts", description = "Date based reminders"),
        (name = "budgets", description = "Monthly budgets of expense categories"),
    ),
    info(
        title = "PoupaBem API",
        description = "Personal finance tracker API - incomes, expenses, budgets, goals and alerts",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
