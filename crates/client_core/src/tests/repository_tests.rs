use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::Mutex};

use super::*;
use crate::coordinator::IntentKind;

#[derive(Clone, Default)]
struct ServerState {
    posted: Arc<Mutex<Vec<Value>>>,
}

fn employee_json(id: i64, code: &str) -> Value {
    json!({
        "id": id,
        "employee_id": code,
        "first_name": "Brian",
        "last_name": "Mutua",
        "email": "brian@example.com",
        "phone": "+254722000000",
        "basic_salary": 40000,
        "hire_date": "2021-07-15",
        "department": "Sales",
        "status": "active"
    })
}

async fn list_employees() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": [employee_json(1, "EMP001"), employee_json(2, "EMP002")]
    }))
}

async fn get_employee(Path(id): Path<i64>) -> Json<Value> {
    Json(employee_json(id, "EMP001"))
}

async fn create_employee(
    State(state): State<ServerState>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    state.posted.lock().await.push(body.clone());
    let mut created = body;
    created["id"] = json!(7);
    (StatusCode::CREATED, Json(json!({ "success": true, "data": created })))
}

async fn update_employee(Path(id): Path<i64>, Json(mut body): Json<Value>) -> impl IntoResponse {
    if id == 404 {
        return (StatusCode::NOT_FOUND, Json(json!({ "message": "Employee not found" })))
            .into_response();
    }
    body["id"] = json!(id);
    Json(body).into_response()
}

async fn delete_employee(Path(id): Path<i64>) -> impl IntoResponse {
    if id == 1 {
        StatusCode::NO_CONTENT.into_response()
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "database is on fire").into_response()
    }
}

async fn payroll() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": [{
            "employee_id": 1,
            "employee_code": "EMP001",
            "full_name": "Brian Mutua",
            "department": "Sales",
            "gross_salary": 90000,
            "deductions": { "shif": 2475, "housing_levy": 1350, "paye": 11175, "total": 15000 },
            "net_salary": 75000
        }],
        "summary": {
            "total_employees": 1,
            "total_gross_salary": 90000,
            "total_deductions": 15000,
            "total_net_salary": 75000
        }
    }))
}

async fn employee_payroll() -> Json<Value> {
    Json(json!({
        "success": false,
        "message": "Employee is inactive",
        "data": [],
        "summary": {
            "total_employees": 0,
            "total_gross_salary": 0,
            "total_deductions": 0,
            "total_net_salary": 0
        }
    }))
}

async fn spawn_api_server() -> anyhow::Result<(Url, ServerState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = ServerState::default();
    let api = Router::new()
        .route("/employees", get(list_employees).post(create_employee))
        .route(
            "/employees/:id",
            get(get_employee).put(update_employee).delete(delete_employee),
        )
        .route("/employees/:id/payroll", get(employee_payroll))
        .route("/payroll", get(payroll))
        .with_state(state.clone());
    let app = Router::new().nest("/api", api);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((Url::parse(&format!("http://{addr}/api/"))?, state))
}

async fn repository() -> (HttpEmployeeRepository, ServerState) {
    let (base_url, state) = spawn_api_server().await.expect("spawn server");
    let repository = HttpEmployeeRepository::new(&base_url, Some(std::time::Duration::from_secs(5)))
        .expect("repository");
    (repository, state)
}

#[tokio::test]
async fn list_unwraps_data_envelope() {
    let (repository, _) = repository().await;
    assert!(!repository.base_url().ends_with('/'));

    let employees = repository.list_employees().await.expect("list");

    let codes: Vec<_> = employees.iter().map(|e| e.employee_code.as_str()).collect();
    assert_eq!(codes, vec!["EMP001", "EMP002"]);
}

#[tokio::test]
async fn get_accepts_bare_body() {
    let (repository, _) = repository().await;
    let employee = repository.get_employee(EmployeeId(5)).await.expect("get");
    assert_eq!(employee.id, Some(EmployeeId(5)));
    assert_eq!(employee.basic_salary, Decimal::from(40000));
}

#[tokio::test]
async fn create_posts_draft_without_id() {
    let (repository, state) = repository().await;
    let draft: Employee = serde_json::from_value(employee_json(99, "EMP010")).expect("draft");

    let created = repository.create_employee(&draft).await.expect("create");

    assert_eq!(created.id, Some(EmployeeId(7)));
    assert_eq!(created.employee_code, "EMP010");
    let posted = state.posted.lock().await;
    assert_eq!(posted.len(), 1);
    assert!(posted[0].get("id").is_none(), "draft must not carry an id");
    assert_eq!(posted[0]["employee_id"], "EMP010");
}

#[tokio::test]
async fn update_surfaces_server_message_on_status_error() {
    let (repository, _) = repository().await;
    let employee: Employee =
        serde_json::from_value(employee_json(404, "EMP404")).expect("employee");

    let err = repository
        .update_employee(EmployeeId(404), &employee)
        .await
        .expect_err("must fail");

    assert!(
        matches!(err, RepositoryError::Status { status: 404, .. }),
        "unexpected error: {err:?}"
    );
    assert_eq!(err.user_message(IntentKind::UpdateEmployee), "Employee not found");
}

#[tokio::test]
async fn update_returns_server_record() {
    let (repository, _) = repository().await;
    let mut employee: Employee =
        serde_json::from_value(employee_json(2, "EMP002")).expect("employee");
    employee.department = "Marketing".to_string();

    let updated = repository
        .update_employee(EmployeeId(2), &employee)
        .await
        .expect("update");

    assert_eq!(updated, employee);
}

#[tokio::test]
async fn delete_succeeds_on_status_alone() {
    let (repository, _) = repository().await;
    repository.delete_employee(EmployeeId(1)).await.expect("delete");
}

#[tokio::test]
async fn non_json_error_body_uses_fallback_message() {
    let (repository, _) = repository().await;
    let err = repository
        .delete_employee(EmployeeId(2))
        .await
        .expect_err("must fail");

    assert_eq!(err.server_message(), None);
    assert_eq!(err.user_message(IntentKind::DeleteEmployee), "Failed to delete employee");
}

#[tokio::test]
async fn payroll_report_is_unwrapped_verbatim() {
    let (repository, _) = repository().await;
    let report = repository.payroll_report().await.expect("payroll");

    assert_eq!(report.summary.total_employees, 1);
    assert_eq!(report.summary.total_gross_salary, Decimal::from(90000));
    assert_eq!(report.summary.total_deductions, Decimal::from(15000));
    assert_eq!(report.summary.total_net_salary, Decimal::from(75000));
    assert!(report.summary.is_balanced());
    assert_eq!(report.line_items[0].deductions.housing_levy, Decimal::from(1350));
}

#[tokio::test]
async fn unsuccessful_payroll_envelope_is_rejected() {
    let (repository, _) = repository().await;
    let err = repository
        .employee_payroll(EmployeeId(3))
        .await
        .expect_err("must fail");

    assert!(matches!(err, RepositoryError::Rejected(_)));
    assert_eq!(err.user_message(IntentKind::FetchPayroll), "Employee is inactive");
}

#[tokio::test]
async fn unreachable_server_is_a_transport_failure() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let base_url = Url::parse(&format!("http://{addr}/api")).expect("url");
    let repository = HttpEmployeeRepository::new(&base_url, None).expect("repository");
    let err = repository.list_employees().await.expect_err("must fail");

    assert!(matches!(err, RepositoryError::Transport { .. }), "unexpected error: {err:?}");
    assert_eq!(err.user_message(IntentKind::FetchEmployees), "Failed to fetch employees");
}
