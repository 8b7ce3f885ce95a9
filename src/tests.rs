use crate::router::create_router;
use crate::schemas::{ApiResponse, ErrorResponse};
use crate::test_utils::*;
use axum::http::{StatusCode, header::AUTHORIZATION};
use axum_test::TestServer;
use rust_decimal::Decimal;
use sea_orm::ConnectionTrait;
use serde_json::{Value, json};
use std::str::FromStr;

/// Amounts travel as decimal strings; accept plain numbers too.
fn dec(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).unwrap(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).unwrap(),
        other => panic!("not an amount: {}", other),
    }
}

async fn expense_category(server: &TestServer, token: &str, spending_limit: Option<i64>) -> i64 {
    create_category(
        server,
        token,
        json!({"nome": "Mercado", "tipo": "despesa", "limite_gasto": spending_limit}),
    )
    .await
}

async fn income_category(server: &TestServer, token: &str) -> i64 {
    create_category(server, token, json!({"nome": "Salário", "tipo": "receita"})).await
}

async fn add_expense(server: &TestServer, token: &str, category_id: i64, valor: &str, data: &str) -> Value {
    let response = server
        .post("/despesa/create")
        .add_header(AUTHORIZATION, bearer(token))
        .json(&json!({
            "categoria_id": category_id,
            "valor": valor,
            "data": data,
            "descricao": "Compra",
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: ApiResponse<Value> = response.json();
    body.data
}

async fn add_income(server: &TestServer, token: &str, category_id: i64, valor: &str, data: &str) -> Value {
    let response = server
        .post("/receita/create")
        .add_header(AUTHORIZATION, bearer(token))
        .json(&json!({
            "categoria_id": category_id,
            "valor": valor,
            "data": data,
            "descricao": "Pagamento",
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: ApiResponse<Value> = response.json();
    body.data
}

#[tokio::test]
async fn test_health_check() {
    let server = setup_test_server().await;

    let response = server.get("/health").await;

    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_register_and_login() {
    let _tracing = init_test_tracing();
    let server = setup_test_server().await;

    let response = server
        .post("/user/register")
        .json(&json!({
            "name": "Maria Silva",
            "email": "maria@example.com",
            "password": "segredo123",
            "cpf": "52998224725",
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: ApiResponse<Value> = response.json();
    assert!(body.success);
    assert_eq!(body.data["email"], "maria@example.com");
    assert!(body.data.get("password").is_none());
    assert!(body.data.get("password_hash").is_none());

    let response = server
        .post("/user/login")
        .json(&json!({"email": "maria@example.com", "password": "segredo123"}))
        .await;
    response.assert_status_ok();
    let body: ApiResponse<Value> = response.json();
    let token = body.data["token"].as_str().unwrap().to_string();
    assert_eq!(body.data["user"]["cpf"], "52998224725");

    let response = server
        .get("/user/me")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status_ok();
    let body: ApiResponse<Value> = response.json();
    assert_eq!(body.data["name"], "Maria Silva");
}

#[tokio::test]
async fn test_register_rejects_used_email_and_cpf() {
    let server = setup_test_server().await;
    register_user(&server, "maria@example.com", "52998224725").await;

    let response = server
        .post("/user/register")
        .json(&json!({
            "name": "Outra Maria",
            "email": "maria@example.com",
            "password": "segredo123",
            "cpf": "11144477735",
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json();
    assert_eq!(body.message, "Email already in use");
    assert!(!body.success);

    let response = server
        .post("/user/register")
        .json(&json!({
            "name": "Outra Maria",
            "email": "outra@example.com",
            "password": "segredo123",
            "cpf": "52998224725",
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json();
    assert_eq!(body.message, "CPF already in use");
}

#[tokio::test]
async fn test_register_validates_fields() {
    let server = setup_test_server().await;

    let response = server
        .post("/user/register")
        .json(&json!({"email": "maria@example.com"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json();
    assert_eq!(body.code, "MISSING_FIELDS");
    assert_eq!(body.message, "Missing required fields: name, password, cpf");

    let response = server
        .post("/user/register")
        .json(&json!({
            "name": "Maria",
            "email": "maria@example.com",
            "password": "segredo123",
            "cpf": "11111111111",
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json();
    assert_eq!(body.message, "Invalid CPF");

    let response = server
        .post("/user/register")
        .json(&json!({
            "name": "Maria",
            "email": "not-an-email",
            "password": "123",
            "cpf": "52998224725",
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json();
    assert_eq!(body.code, "VALIDATION_ERROR");
    assert!(body.message.contains("email"));
    assert!(body.message.contains("password"));
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let server = setup_test_server().await;
    register_user(&server, "maria@example.com", "52998224725").await;

    let response = server
        .post("/user/login")
        .json(&json!({"email": "maria@example.com", "password": "errada"}))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: ErrorResponse = response.json();
    assert_eq!(body.message, "Email or password incorrect");

    let response = server
        .post("/user/login")
        .json(&json!({"email": "ninguem@example.com", "password": "segredo123"}))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: ErrorResponse = response.json();
    assert_eq!(body.message, "Email or password incorrect");
}

#[tokio::test]
async fn test_guest_routes_reject_authenticated_requests() {
    let server = setup_test_server().await;
    let (_, token) = signed_in_user(&server, "maria@example.com", "52998224725").await;

    let response = server
        .post("/user/login")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({"email": "maria@example.com", "password": "segredo123"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json();
    assert_eq!(body.message, "Already authenticated");

    // An invalid token does not count as a session
    let response = server
        .post("/user/login")
        .add_header(AUTHORIZATION, bearer("garbage"))
        .json(&json!({"email": "maria@example.com", "password": "segredo123"}))
        .await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_protected_routes_require_valid_token() {
    let server = setup_test_server().await;
    let (user_id, _) = signed_in_user(&server, "maria@example.com", "52998224725").await;

    let response = server.get(&format!("/categoria/{}", user_id)).await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: ErrorResponse = response.json();
    assert_eq!(body.code, "UNAUTHORIZED");

    let response = server
        .get(&format!("/categoria/{}", user_id))
        .add_header(AUTHORIZATION, bearer("not.a.token"))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_foreign_user_access() {
    let server = setup_test_server().await;
    let (maria_id, maria) = signed_in_user(&server, "maria@example.com", "52998224725").await;
    let (_, joao) = signed_in_user(&server, "joao@example.com", "11144477735").await;
    let category_id = expense_category(&server, &maria, None).await;

    // Naming another user is an authentication failure
    let response = server
        .get(&format!("/despesa/{}", maria_id))
        .add_header(AUTHORIZATION, bearer(&joao))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let response = server
        .post("/categoria/create")
        .add_header(AUTHORIZATION, bearer(&joao))
        .json(&json!({"usuario_id": maria_id, "nome": "Intrusa", "tipo": "despesa"}))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    // Another user's rows do not exist for the caller
    let response = server
        .delete(&format!("/categoria/delete/{}", category_id))
        .add_header(AUTHORIZATION, bearer(&joao))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);

    let response = server
        .post("/despesa/create")
        .add_header(AUTHORIZATION, bearer(&joao))
        .json(&json!({"categoria_id": category_id, "valor": "10.00", "data": "2024-01-10", "descricao": "Compra"}))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_category_validation() {
    let server = setup_test_server().await;
    let (_, token) = signed_in_user(&server, "maria@example.com", "52998224725").await;

    let response = server
        .post("/categoria/create")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({"nome": "  "}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json();
    assert_eq!(body.message, "Missing required fields: nome, tipo");

    let response = server
        .post("/categoria/create")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({"nome": "Mercado", "tipo": "outro"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server
        .post("/categoria/create")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({"nome": "Salário", "tipo": "receita", "limite_gasto": 100}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server
        .post("/categoria/create")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({"nome": "Mercado", "tipo": "despesa", "limite_gasto": "abc"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json();
    assert_eq!(body.code, "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_expense_limit_signals() {
    let server = setup_test_server().await;
    let (_, token) = signed_in_user(&server, "maria@example.com", "52998224725").await;
    let category_id = expense_category(&server, &token, Some(100)).await;

    let first = add_expense(&server, &token, category_id, "50", "2024-01-05").await;
    assert_eq!(first["sinal"], "within_limit");
    assert_eq!(first["limites"][0]["escopo"], "total");

    let second = add_expense(&server, &token, category_id, "45", "2024-01-06").await;
    assert_eq!(second["sinal"], "near_limit");
    assert_eq!(dec(&second["limites"][0]["gasto"]), Decimal::new(95, 0));
    assert_eq!(dec(&second["limites"][0]["limite"]), Decimal::new(100, 0));

    let third = add_expense(&server, &token, category_id, "6", "2024-01-07").await;
    assert_eq!(third["sinal"], "limit_exceeded");
    assert_eq!(dec(&third["limites"][0]["gasto"]), Decimal::new(101, 0));

    // No history is kept: the signal fires again
    let fourth = add_expense(&server, &token, category_id, "1", "2024-01-08").await;
    assert_eq!(fourth["sinal"], "limit_exceeded");
}

#[tokio::test]
async fn test_expense_without_ceiling_has_no_checks() {
    let server = setup_test_server().await;
    let (_, token) = signed_in_user(&server, "maria@example.com", "52998224725").await;
    let category_id = expense_category(&server, &token, None).await;

    let created = add_expense(&server, &token, category_id, "500", "2024-01-05").await;
    assert_eq!(created["limites"], json!([]));
    assert_eq!(created["sinal"], "within_limit");
    assert_eq!(dec(&created["despesa"]["valor"]), Decimal::new(500, 0));
}

#[tokio::test]
async fn test_expense_is_not_kept_when_limit_checks_fail() {
    let state = setup_test_app_state().await;
    let db = state.db.clone();
    let server = TestServer::new(create_router(state)).unwrap();
    let (user_id, token) = signed_in_user(&server, "maria@example.com", "52998224725").await;
    let category_id = expense_category(&server, &token, Some(100)).await;

    // Monthly ceilings are read from budgets, so the check now fails
    db.execute_unprepared("DROP TABLE budgets").await.unwrap();

    let response = server
        .post("/despesa/create")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({"categoria_id": category_id, "valor": "10.00", "data": "2024-01-10", "descricao": "Compra"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json();
    assert_eq!(body.code, "DATABASE_ERROR");

    let response = server
        .get(&format!("/despesa/{}", user_id))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status_ok();
    let body: ApiResponse<Vec<Value>> = response.json();
    assert!(body.data.is_empty());
}

#[tokio::test]
async fn test_entry_validation() {
    let server = setup_test_server().await;
    let (_, token) = signed_in_user(&server, "maria@example.com", "52998224725").await;
    let expense_id = expense_category(&server, &token, None).await;
    let income_id = income_category(&server, &token).await;

    let response = server
        .post("/despesa/create")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({"categoria_id": expense_id}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json();
    assert_eq!(body.message, "Missing required fields: valor, data, descricao");

    // Income entries cannot go into an expense category
    let response = server
        .post("/receita/create")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({"categoria_id": expense_id, "valor": "10.00", "data": "2024-01-10", "descricao": "Compra"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server
        .post("/despesa/create")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({"categoria_id": income_id, "valor": "10.00", "data": "2024-01-10", "descricao": "Compra"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server
        .post("/despesa/create")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({"categoria_id": expense_id, "valor": -5, "data": "2024-01-10", "descricao": "x"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server
        .post("/despesa/create")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({
            "categoria_id": expense_id, "valor": 5, "data": "2024-01-10", "descricao": "x",
            "latitude": 123.0,
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server
        .post("/despesa/create")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({"categoria_id": expense_id, "valor": 5, "data": "10/01/2024", "descricao": "x"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_totals() {
    let server = setup_test_server().await;
    let (user_id, token) = signed_in_user(&server, "maria@example.com", "52998224725").await;

    // Empty ledgers total zero
    let response = server
        .get(&format!("/despesa/total/{}", user_id))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status_ok();
    let body: ApiResponse<Value> = response.json();
    assert_eq!(dec(&body.data["total"]), Decimal::ZERO);

    let expense_id = expense_category(&server, &token, None).await;
    let income_id = income_category(&server, &token).await;
    add_expense(&server, &token, expense_id, "10.50", "2024-01-10").await;
    add_expense(&server, &token, expense_id, "20", "2024-02-10").await;
    add_income(&server, &token, income_id, "1000", "2024-01-05").await;

    let response = server
        .get(&format!("/despesa/total/{}", user_id))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    let body: ApiResponse<Value> = response.json();
    assert_eq!(dec(&body.data["total"]), Decimal::from_str("30.50").unwrap());
    assert_eq!(body.data["periodo"], Value::Null);

    let response = server
        .get(&format!("/despesa/total/{}", user_id))
        .add_query_param("inicio", "2024-01-01")
        .add_query_param("fim", "2024-01-31")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status_ok();
    let body: ApiResponse<Value> = response.json();
    assert_eq!(dec(&body.data["total"]), Decimal::from_str("10.50").unwrap());
    assert_eq!(body.data["periodo"]["start"], "2024-01-01");

    let response = server
        .get(&format!("/receita/total/{}", user_id))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    let body: ApiResponse<Value> = response.json();
    assert_eq!(dec(&body.data["total"]), Decimal::new(1000, 0));

    let response = server
        .get(&format!("/categoria/total/{}", expense_id))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status_ok();
    let body: ApiResponse<Value> = response.json();
    assert_eq!(body.data["tipo"], "despesa");
    assert_eq!(dec(&body.data["total"]), Decimal::from_str("30.50").unwrap());

    let response = server
        .get(&format!("/despesa/categorias/{}", user_id))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    let body: ApiResponse<Vec<Value>> = response.json();
    assert_eq!(body.data.len(), 1);
    assert_eq!(body.data[0]["categoria"]["id"].as_i64().unwrap(), expense_id);

    let response = server
        .get(&format!("/receita/por-categoria/{}", income_id))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    let body: ApiResponse<Vec<Value>> = response.json();
    assert_eq!(body.data.len(), 1);

    let response = server
        .get(&format!("/receita/por-categoria/{}", expense_id))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_totals_reject_inverted_range() {
    let server = setup_test_server().await;
    let (user_id, token) = signed_in_user(&server, "maria@example.com", "52998224725").await;

    let response = server
        .get(&format!("/receita/total/{}", user_id))
        .add_query_param("inicio", "2024-02-01")
        .add_query_param("fim", "2024-01-01")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json();
    assert_eq!(body.code, "VALIDATION_ERROR");
    assert_eq!(body.message, "inicio must not be after fim");
    assert!(!body.success);

    let response = server
        .get(&format!("/despesa/total/{}", user_id))
        .add_query_param("inicio", "2024-02-01")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json();
    assert_eq!(body.message, "inicio and fim must be given together");
}

#[tokio::test]
async fn test_unparsable_path_and_query_use_error_shape() {
    let server = setup_test_server().await;
    let (user_id, token) = signed_in_user(&server, "maria@example.com", "52998224725").await;

    let response = server
        .get("/despesa/total/abc")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json();
    assert_eq!(body.code, "VALIDATION_ERROR");
    assert!(!body.success);

    let response = server
        .delete("/alert/delete/not-a-number")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json();
    assert_eq!(body.code, "VALIDATION_ERROR");

    let response = server
        .get(&format!("/receita/total/{}", user_id))
        .add_query_param("inicio", "notadate")
        .add_query_param("fim", "2024-01-31")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json();
    assert_eq!(body.code, "VALIDATION_ERROR");
    assert!(!body.success);
}

#[tokio::test]
async fn test_delete_entries() {
    let server = setup_test_server().await;
    let (user_id, token) = signed_in_user(&server, "maria@example.com", "52998224725").await;
    let income_id = income_category(&server, &token).await;
    let income = add_income(&server, &token, income_id, "100", "2024-01-05").await;
    let id = income["id"].as_i64().unwrap();

    let response = server
        .delete(&format!("/receita/delete/{}", id))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status_ok();

    let response = server
        .delete(&format!("/receita/delete/{}", id))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: ErrorResponse = response.json();
    assert_eq!(body.message, "Income not found");

    let response = server
        .get(&format!("/receita/{}", user_id))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    let body: ApiResponse<Vec<Value>> = response.json();
    assert!(body.data.is_empty());
}

#[tokio::test]
async fn test_delete_income_category_removes_its_incomes() {
    let server = setup_test_server().await;
    let (user_id, token) = signed_in_user(&server, "maria@example.com", "52998224725").await;
    let category_id = income_category(&server, &token).await;
    add_income(&server, &token, category_id, "100", "2024-01-05").await;
    add_income(&server, &token, category_id, "200", "2024-01-06").await;

    let response = server
        .delete(&format!("/categoria/delete/{}", category_id))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status_ok();
    let body: ApiResponse<Value> = response.json();
    assert_eq!(body.data["receitas"], 2);
    assert_eq!(body.data["despesas"], 0);

    let response = server
        .get(&format!("/receita/{}", user_id))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    let body: ApiResponse<Vec<Value>> = response.json();
    assert!(body.data.is_empty());

    let response = server
        .get(&format!("/categoria/total/{}", category_id))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: ErrorResponse = response.json();
    assert_eq!(body.message, "Category not found");
}

#[tokio::test]
async fn test_category_kind_change_converts_entries() {
    let server = setup_test_server().await;
    let (user_id, token) = signed_in_user(&server, "maria@example.com", "52998224725").await;
    let category_id = expense_category(&server, &token, Some(100)).await;
    add_expense(&server, &token, category_id, "30", "2024-01-05").await;
    add_expense(&server, &token, category_id, "20", "2024-01-06").await;

    let response = server
        .put(&format!("/categoria/update/{}", category_id))
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({"tipo": "receita", "nome": "Reembolsos"}))
        .await;
    response.assert_status_ok();
    let body: ApiResponse<Value> = response.json();
    assert_eq!(body.data["entradas_convertidas"], 2);
    assert_eq!(body.data["categoria"]["tipo"], "receita");
    assert_eq!(body.data["categoria"]["nome"], "Reembolsos");
    assert_eq!(body.data["categoria"]["limite_gasto"], Value::Null);

    let response = server
        .get(&format!("/despesa/{}", user_id))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    let body: ApiResponse<Vec<Value>> = response.json();
    assert!(body.data.is_empty());

    let response = server
        .get(&format!("/receita/{}", user_id))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    let body: ApiResponse<Vec<Value>> = response.json();
    assert_eq!(body.data.len(), 2);
    assert_eq!(body.data[0]["data"], "2024-01-05");
    assert_eq!(dec(&body.data[0]["valor"]), Decimal::new(30, 0));
}

#[tokio::test]
async fn test_category_update_clears_limit_with_null() {
    let server = setup_test_server().await;
    let (_, token) = signed_in_user(&server, "maria@example.com", "52998224725").await;
    let category_id = create_category(
        &server,
        &token,
        json!({"nome": "Mercado", "tipo": "despesa", "limite_gasto": 100, "orcamento_mensal": 50}),
    )
    .await;

    let response = server
        .put(&format!("/categoria/update/{}", category_id))
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({"limite_gasto": null}))
        .await;
    response.assert_status_ok();
    let body: ApiResponse<Value> = response.json();
    assert_eq!(body.data["categoria"]["limite_gasto"], Value::Null);
    assert_eq!(dec(&body.data["categoria"]["orcamento_mensal"]), Decimal::new(50, 0));
    assert_eq!(body.data["entradas_convertidas"], 0);
}

#[tokio::test]
async fn test_general_goal_valuation() {
    let server = setup_test_server().await;
    let (user_id, token) = signed_in_user(&server, "maria@example.com", "52998224725").await;
    let income_id = income_category(&server, &token).await;
    let expense_id = expense_category(&server, &token, None).await;
    add_income(&server, &token, income_id, "800", "2024-01-10").await;
    add_expense(&server, &token, expense_id, "200", "2024-01-20").await;
    // Outside the goal's period
    add_income(&server, &token, income_id, "5000", "2024-02-01").await;

    let response = server
        .post("/meta_financeira/create")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({
            "titulo": "Reserva",
            "valor_meta": 500,
            "data_inicio": "2024-01-01",
            "data_fim": "2024-01-31",
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: ApiResponse<Value> = response.json();
    assert_eq!(body.data["tipo"], "geral");
    assert_eq!(dec(&body.data["valor_atual"]), Decimal::new(600, 0));
    assert_eq!(body.data["atingida"], true);
    assert_eq!(dec(&body.data["percentual"]), Decimal::new(120, 0));

    // Reads revalue the goal
    add_expense(&server, &token, expense_id, "150", "2024-01-25").await;
    let response = server
        .get(&format!("/meta_financeira/{}", user_id))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status_ok();
    let body: ApiResponse<Vec<Value>> = response.json();
    assert_eq!(body.data.len(), 1);
    assert_eq!(dec(&body.data[0]["valor_atual"]), Decimal::new(450, 0));
    assert_eq!(body.data[0]["atingida"], false);
}

#[tokio::test]
async fn test_goal_validation_and_category_goals() {
    let server = setup_test_server().await;
    let (_, token) = signed_in_user(&server, "maria@example.com", "52998224725").await;
    let expense_id = expense_category(&server, &token, None).await;
    add_expense(&server, &token, expense_id, "80", "2024-01-10").await;

    let response = server
        .post("/meta_financeira/create")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({"titulo": "Meta"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json();
    assert_eq!(body.message, "Missing required fields: valor_meta, data_inicio, data_fim");

    let response = server
        .post("/meta_financeira/create")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({
            "titulo": "Meta", "valor_meta": 100, "tipo": "categoria",
            "data_inicio": "2024-01-01", "data_fim": "2024-01-31",
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server
        .post("/meta_financeira/create")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({
            "titulo": "Meta", "valor_meta": 100,
            "data_inicio": "2024-02-01", "data_fim": "2024-01-31",
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    // Expense category goals are caps
    let response = server
        .post("/meta_financeira/create")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({
            "titulo": "Gastar pouco", "valor_meta": 100, "tipo": "categoria",
            "categoria_id": expense_id,
            "data_inicio": "2024-01-01", "data_fim": "2024-01-31",
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: ApiResponse<Value> = response.json();
    assert_eq!(dec(&body.data["valor_atual"]), Decimal::new(80, 0));
    assert_eq!(body.data["atingida"], true);

    let response = server
        .post("/meta_financeira/create")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({
            "titulo": "Fantasma", "valor_meta": 100, "tipo": "categoria",
            "categoria_id": 9999,
            "data_inicio": "2024-01-01", "data_fim": "2024-01-31",
        }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_goal_preview_update_and_delete() {
    let server = setup_test_server().await;
    let (user_id, token) = signed_in_user(&server, "maria@example.com", "52998224725").await;
    let income_id = income_category(&server, &token).await;
    add_income(&server, &token, income_id, "300", "2024-01-10").await;

    let response = server
        .post("/meta_financeira/preview")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({
            "tipo": "receita", "valor_meta": 0,
            "data_inicio": "2024-01-01", "data_fim": "2024-01-31",
        }))
        .await;
    response.assert_status_ok();
    let body: ApiResponse<Value> = response.json();
    assert_eq!(dec(&body.data["valor_atual"]), Decimal::new(300, 0));
    // A zero target is never reached
    assert_eq!(body.data["atingida"], false);
    assert_eq!(dec(&body.data["percentual"]), Decimal::ZERO);

    // Previews store nothing
    let response = server
        .get(&format!("/meta_financeira/{}", user_id))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    let body: ApiResponse<Vec<Value>> = response.json();
    assert!(body.data.is_empty());

    let response = server
        .post("/meta_financeira/create")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({
            "titulo": "Renda", "tipo": "receita", "valor_meta": 1000,
            "data_inicio": "2024-01-01", "data_fim": "2024-01-31",
        }))
        .await;
    let body: ApiResponse<Value> = response.json();
    let goal_id = body.data["id"].as_i64().unwrap();
    assert_eq!(body.data["atingida"], false);

    let response = server
        .put("/meta_financeira/update")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({"valor_meta": 250}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json();
    assert_eq!(body.message, "Missing required fields: meta_id");

    let response = server
        .put("/meta_financeira/update")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({"meta_id": goal_id, "valor_meta": 250}))
        .await;
    response.assert_status_ok();
    let body: ApiResponse<Value> = response.json();
    assert_eq!(body.data["titulo"], "Renda");
    assert_eq!(dec(&body.data["valor_meta"]), Decimal::new(250, 0));
    assert_eq!(body.data["atingida"], true);

    let response = server
        .delete(&format!("/meta_financeira/delete/{}", goal_id))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status_ok();

    let response = server
        .delete(&format!("/meta_financeira/delete/{}", goal_id))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_alerts_fired_and_upcoming() {
    let server = setup_test_server().await;
    let (user_id, token) = signed_in_user(&server, "maria@example.com", "52998224725").await;

    // The test app's today is 2024-01-15
    for (titulo, data) in [
        ("Passado", "2024-01-14"),
        ("Hoje", "2024-01-15"),
        ("Depois", "2024-03-01"),
        ("Amanhã", "2024-01-16"),
    ] {
        let response = server
            .post("/alert/create")
            .add_header(AUTHORIZATION, bearer(&token))
            .json(&json!({"titulo": titulo, "descricao": "Pagar conta", "data_alerta": data}))
            .await;
        response.assert_status(StatusCode::CREATED);
    }

    let response = server
        .get(&format!("/alert/{}", user_id))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status_ok();
    let body: ApiResponse<Vec<Value>> = response.json();
    assert_eq!(body.data.len(), 1);
    assert_eq!(body.data[0]["titulo"], "Hoje");

    let response = server
        .get("/alert/all")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status_ok();
    let body: ApiResponse<Vec<Value>> = response.json();
    let titles: Vec<&str> = body.data.iter().map(|a| a["titulo"].as_str().unwrap()).collect();
    assert_eq!(titles, vec!["Amanhã", "Depois"]);
}

#[tokio::test]
async fn test_alert_update_and_delete() {
    let server = setup_test_server().await;
    let (user_id, token) = signed_in_user(&server, "maria@example.com", "52998224725").await;

    let response = server
        .post("/alert/create")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({"titulo": "Aluguel"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json();
    assert_eq!(body.message, "Missing required fields: descricao, data_alerta");

    let response = server
        .post("/alert/create")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({"titulo": "Aluguel", "descricao": "Dia 10", "data_alerta": "2024-02-10"}))
        .await;
    let body: ApiResponse<Value> = response.json();
    let alert_id = body.data["id"].as_i64().unwrap();

    let response = server
        .put("/alert/update")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({"alert_id": alert_id, "data_alerta": "2024-01-15"}))
        .await;
    response.assert_status_ok();
    let body: ApiResponse<Value> = response.json();
    assert_eq!(body.data["titulo"], "Aluguel");
    assert_eq!(body.data["data_alerta"], "2024-01-15");

    let response = server
        .get(&format!("/alert/{}", user_id))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    let body: ApiResponse<Vec<Value>> = response.json();
    assert_eq!(body.data.len(), 1);

    let response = server
        .delete(&format!("/alert/delete/{}", alert_id))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status_ok();

    let response = server
        .put("/alert/update")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({"alert_id": alert_id, "titulo": "Outro"}))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_budgets() {
    let server = setup_test_server().await;
    let (user_id, token) = signed_in_user(&server, "maria@example.com", "52998224725").await;
    let expense_id = expense_category(&server, &token, None).await;
    let income_id = income_category(&server, &token).await;

    let response = server
        .post("/orcamento/create")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({"categoria_id": expense_id, "limite": 200, "mes_ano": "2024-01"}))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: ApiResponse<Value> = response.json();
    let budget_id = body.data["id"].as_i64().unwrap();
    assert_eq!(body.data["status"], "within_limit");

    // The budget now drives the monthly check of new expenses
    let created = add_expense(&server, &token, expense_id, "190", "2024-01-20").await;
    assert_eq!(created["sinal"], "near_limit");
    assert_eq!(created["limites"][0]["escopo"], "2024-01");

    let response = server
        .get(&format!("/orcamento/{}", user_id))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status_ok();
    let body: ApiResponse<Vec<Value>> = response.json();
    assert_eq!(body.data.len(), 1);
    assert_eq!(dec(&body.data[0]["gasto"]), Decimal::new(190, 0));
    assert_eq!(body.data[0]["status"], "near_limit");

    let response = server
        .post("/orcamento/create")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({"categoria_id": expense_id, "limite": 300, "mes_ano": "2024-01"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json();
    assert_eq!(body.code, "CONFLICT");

    let response = server
        .post("/orcamento/create")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({"categoria_id": income_id, "limite": 300, "mes_ano": "2024-01"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server
        .post("/orcamento/create")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({"categoria_id": expense_id, "limite": 300, "mes_ano": "2024-13"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server
        .delete(&format!("/orcamento/delete/{}", budget_id))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status_ok();

    let response = server
        .delete(&format!("/orcamento/delete/{}", budget_id))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_json_uses_error_shape() {
    let server = setup_test_server().await;

    let response = server
        .post("/user/login")
        .content_type("application/json")
        .bytes("{not json".into())
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json();
    assert_eq!(body.code, "VALIDATION_ERROR");
    assert!(!body.success);
}

#[tokio::test]
async fn test_metrics_route_absent_from_test_router() {
    let server = setup_test_server().await;

    // The metrics recorder is not installed in test routers
    let response = server.get("/metrics").await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let server = setup_test_server().await;

    let response = server.get("/api-docs/openapi.json").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["info"]["title"], "PoupaBem API");
    assert!(body["paths"].get("/despesa/create").is_some());
}
