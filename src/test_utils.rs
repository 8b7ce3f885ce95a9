use crate::config::{Settings, build_app_state};
use crate::router::create_router;
use crate::schemas::{ApiResponse, AppState};
use axum::Router;
use axum::http::{HeaderValue, StatusCode, header::AUTHORIZATION};
use axum_test::TestServer;
use chrono::NaiveDate;
use compute::default_compute;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

/// Date every test app treats as today.
pub const TODAY: (i32, u32, u32) = (2024, 1, 15);

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(TODAY.0, TODAY.1, TODAY.2).unwrap()
}

/// Create an in-memory SQLite database for testing
pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory database");
    db.execute_unprepared("PRAGMA foreign_keys = ON;")
        .await
        .expect("Failed to enable foreign keys");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

pub fn test_settings() -> Settings {
    Settings {
        jwt_secret: "test-secret".to_string(),
        // Minimum bcrypt cost keeps the tests fast
        password_cost: 4,
        ..Settings::default()
    }
}

/// Create AppState for testing, with "today" pinned to [`TODAY`]
pub async fn setup_test_app_state() -> AppState {
    let db = setup_test_db().await;
    build_app_state(db, test_settings(), default_compute(Some(today())))
}

/// Initialize tracing for tests with output to STDERR.
///
/// The filter comes from RUST_LOG and defaults to `warn`. The returned guard
/// keeps the subscriber installed for the current thread.
pub fn init_test_tracing() -> tracing::subscriber::DefaultGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_default(subscriber)
}

/// Create axum app for testing
pub async fn setup_test_app() -> Router {
    let state = setup_test_app_state().await;
    create_router(state)
}

pub async fn setup_test_server() -> TestServer {
    TestServer::new(setup_test_app().await).unwrap()
}

/// Registers a user with a valid CPF and returns its id.
pub async fn register_user(server: &TestServer, email: &str, cpf: &str) -> i64 {
    let response = server
        .post("/user/register")
        .json(&json!({
            "name": "Maria Silva",
            "email": email,
            "password": "segredo123",
            "cpf": cpf,
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: ApiResponse<Value> = response.json();
    body.data["id"].as_i64().unwrap()
}

pub async fn login(server: &TestServer, email: &str) -> String {
    let response = server
        .post("/user/login")
        .json(&json!({"email": email, "password": "segredo123"}))
        .await;
    response.assert_status_ok();
    let body: ApiResponse<Value> = response.json();
    body.data["token"].as_str().unwrap().to_string()
}

/// Registers and logs in a user, returning `(user_id, bearer token)`.
pub async fn signed_in_user(server: &TestServer, email: &str, cpf: &str) -> (i64, String) {
    let id = register_user(server, email, cpf).await;
    let token = login(server, email).await;
    (id, token)
}

pub fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
}

/// Creates a category through the API and returns its id.
pub async fn create_category(server: &TestServer, token: &str, body: Value) -> i64 {
    let response = server
        .post("/categoria/create")
        .add_header(AUTHORIZATION, bearer(token))
        .json(&body)
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: ApiResponse<Value> = response.json();
    body.data["id"].as_i64().unwrap()
}
