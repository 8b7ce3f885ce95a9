use crate::handlers::{
    alerts::{create_alert, delete_alert, get_fired_alerts, get_upcoming_alerts, update_alert},
    budgets::{create_budget, delete_budget, get_budgets},
    categories::{
        create_category, delete_category, get_categories, get_category_total, update_category,
    },
    entries::{
        create_expense, create_income, delete_expense, delete_income, get_expense_categories,
        get_expense_total, get_expenses, get_expenses_by_category, get_income_categories,
        get_income_total, get_incomes, get_incomes_by_category,
    },
    goals::{create_goal, delete_goal, get_goals, preview_goal, update_goal},
    health::health_check,
    users::{login, me, register},
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.settings.request_timeout_secs);

    let router = Router::new()
        // Health check
        .route("/health", get(health_check))
        // Users
        .route("/user/register", post(register))
        .route("/user/login", post(login))
        .route("/user/me", get(me))
        // Categories
        .route("/categoria/create", post(create_category))
        .route("/categoria/:usuario_id", get(get_categories))
        .route("/categoria/update/:categoria_id", put(update_category))
        .route("/categoria/delete/:categoria_id", delete(delete_category))
        .route("/categoria/total/:categoria_id", get(get_category_total))
        // Expenses
        .route("/despesa/create", post(create_expense))
        .route("/despesa/:usuario_id", get(get_expenses))
        .route("/despesa/delete/:despesa_id", delete(delete_expense))
        .route("/despesa/total/:usuario_id", get(get_expense_total))
        .route("/despesa/categorias/:usuario_id", get(get_expense_categories))
        .route("/despesa/por-categoria/:categoria_id", get(get_expenses_by_category))
        // Incomes
        .route("/receita/create", post(create_income))
        .route("/receita/:usuario_id", get(get_incomes))
        .route("/receita/delete/:receita_id", delete(delete_income))
        .route("/receita/total/:usuario_id", get(get_income_total))
        .route("/receita/categorias/:usuario_id", get(get_income_categories))
        .route("/receita/por-categoria/:categoria_id", get(get_incomes_by_category))
        // Financial goals
        .route("/meta_financeira/create", post(create_goal))
        .route("/meta_financeira/preview", post(preview_goal))
        .route("/meta_financeira/update", put(update_goal))
        .route("/meta_financeira/:usuario_id", get(get_goals))
        .route("/meta_financeira/delete/:meta_id", delete(delete_goal))
        // Alerts
        .route("/alert/create", post(create_alert))
        .route("/alert/all", get(get_upcoming_alerts))
        .route("/alert/update", put(update_alert))
        .route("/alert/:usuario_id", get(get_fired_alerts))
        .route("/alert/delete/:alert_id", delete(delete_alert))
        // Budgets
        .route("/orcamento/create", post(create_budget))
        .route("/orcamento/:usuario_id", get(get_budgets))
        .route("/orcamento/delete/:orcamento_id", delete(delete_budget))
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // The metrics recorder is process global and can only be installed once,
    // so test routers go without it.
    #[cfg(not(test))]
    let router = {
        let (prometheus_layer, metric_handle) = axum_prometheus::PrometheusMetricLayer::pair();
        router
            .route("/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer)
    };

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(timeout))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
