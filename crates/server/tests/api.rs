use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use base64::Engine as _;
use http_body_util::BodyExt;
use sea_orm::{ConnectionTrait, Database, Statement};
use serde_json::{Value, json};
use tower::ServiceExt;

use engine::Engine;
use migration::MigratorTrait;
use server::{ServerState, router};

const CRON_SECRET: &str = "s3cret";

async fn app() -> Router {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db.execute(Statement::from_sql_and_values(
        db.get_database_backend(),
        "INSERT INTO users (username, password) VALUES (?, ?)",
        vec!["alice".into(), "password".into()],
    ))
    .await
    .unwrap();

    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    router(ServerState::new(engine, db).cron_secret(Some(CRON_SECRET.to_string())))
}

fn basic_auth() -> String {
    let credentials = base64::engine::general_purpose::STANDARD.encode("alice:password");
    format!("Basic {credentials}")
}

fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, basic_auth());
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn cron_request(uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(bearer) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {bearer}"));
    }
    builder.body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn create(app: &Router, uri: &str, body: Value) -> String {
    let (status, body) = send(app, request(Method::POST, uri, Some(body))).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn user_routes_require_basic_auth() {
    let app = app().await;

    let anonymous = Request::builder()
        .uri("/accounts")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, anonymous).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let wrong_password = base64::engine::general_purpose::STANDARD.encode("alice:nope");
    let wrong = Request::builder()
        .uri("/accounts")
        .header(header::AUTHORIZATION, format!("Basic {wrong_password}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, wrong).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn paid_entry_moves_listed_balance() {
    let app = app().await;
    let account_id = create(
        &app,
        "/accounts",
        json!({"name": "Checking", "kind": "checking"}),
    )
    .await;
    let category_id = create(
        &app,
        "/categories",
        json!({"name": "Groceries", "kind": "expense"}),
    )
    .await;
    create(
        &app,
        "/entries",
        json!({
            "account_id": account_id,
            "category_id": category_id,
            "description": "Market",
            "amount_minor": 12345,
            "due_date": "2026-03-05",
            "paid_at": "2026-03-05T10:00:00Z",
        }),
    )
    .await;

    let (status, accounts) = send(&app, request(Method::GET, "/accounts", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accounts.as_array().unwrap().len(), 1);
    assert_eq!(accounts[0]["current_balance_minor"], -12345);

    let uri = format!("/accounts/{account_id}/balance");
    let (status, balance) = send(&app, request(Method::GET, &uri, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(balance["paid_expenses_minor"], 12345);
    assert_eq!(balance["balance_minor"], -12345);

    let uri = format!("/accounts/{account_id}/reconcile");
    let (status, reconciled) = send(&app, request(Method::POST, &uri, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reconciled["accounts_updated"], 0);
}

#[tokio::test]
async fn engine_errors_carry_json_body() {
    let app = app().await;

    let uri = format!("/accounts/{}/balance", uuid::Uuid::new_v4());
    let (status, body) = send(&app, request(Method::GET, &uri, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("not"));

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/recurrence/expand",
            Some(json!({
                "rule": "FREQ=HOURLY",
                "start_at": "2026-01-01T09:00:00Z",
                "window_start": "2026-01-01T00:00:00Z",
                "window_end": "2026-02-01T00:00:00Z",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);

    create(
        &app,
        "/accounts",
        json!({"name": "Savings", "kind": "savings"}),
    )
    .await;
    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/accounts",
            Some(json!({"name": "savings", "kind": "savings"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn expand_returns_canonical_rule() {
    let app = app().await;
    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/recurrence/expand",
            Some(json!({
                "rule": "freq=daily;count=3",
                "start_at": "2026-01-01T09:00:00Z",
                "end_at": "2026-01-01T10:00:00Z",
                "window_start": "2026-01-01T00:00:00Z",
                "window_end": "2026-02-01T00:00:00Z",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rule"], "FREQ=DAILY;COUNT=3");
    let occurrences = body["occurrences"].as_array().unwrap();
    assert_eq!(occurrences.len(), 3);
    assert_eq!(occurrences[2]["index"], 2);
}

#[tokio::test]
async fn calendar_rejects_overlong_window() {
    let app = app().await;

    let (status, body) = send(
        &app,
        request(Method::GET, "/calendar?from=2026-01-01&to=2026-12-31", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, body) = send(
        &app,
        request(Method::GET, "/calendar?from=2026-01-01&to=2036-01-01", None),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn export_writes_csv_rows() {
    let app = app().await;
    let account_id = create(
        &app,
        "/accounts",
        json!({"name": "Checking", "kind": "checking"}),
    )
    .await;
    let category_id = create(
        &app,
        "/categories",
        json!({"name": "Rent", "kind": "expense"}),
    )
    .await;
    create(
        &app,
        "/entries",
        json!({
            "account_id": account_id,
            "category_id": category_id,
            "description": "April rent",
            "amount_minor": 150000,
            "due_date": "2026-04-01",
        }),
    )
    .await;

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/entries/export?month=2026-04", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("due_date,account,category,description,amount,paid_at,ignored")
    );
    assert_eq!(
        lines.next(),
        Some("2026-04-01,Checking,Rent,April rent,1500.00,,false")
    );
    assert_eq!(lines.next(), None);
}

#[tokio::test]
async fn cron_requires_bearer_secret() {
    let app = app().await;

    let (status, body) = send(&app, cron_request("/api/cron/daily", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = send(&app, cron_request("/api/cron/daily", Some("wrong"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Basic credentials are not accepted on cron routes.
    let basic = Request::builder()
        .uri("/api/cron/notifications")
        .header(header::AUTHORIZATION, basic_auth())
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, basic).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn cron_without_configured_secret_fails() {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    let app = router(ServerState::new(engine, db));

    let (status, body) = send(&app, cron_request("/api/cron/daily", Some(""))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn cron_daily_runs_every_job() {
    let app = app().await;

    let (status, body) = send(&app, cron_request("/api/cron/daily", Some(CRON_SECRET))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["balances"]["failed_users"], 0);
    assert_eq!(body["statuses"]["events_completed"], 0);
    assert_eq!(body["faturas"]["created"], 0);
    assert_eq!(body["reminders"]["sent"], 0);
}

#[tokio::test]
async fn cron_job_param_selects_subset() {
    let app = app().await;

    let (status, body) = send(
        &app,
        cron_request("/api/cron/daily?job=faturas,statuses", Some(CRON_SECRET)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body.get("balances").is_none());
    assert!(body.get("reminders").is_none());
    assert_eq!(body["faturas"]["created"], 0);
    assert_eq!(body["statuses"]["tasks_overdue"], 0);

    let (status, body) = send(
        &app,
        cron_request("/api/cron/notifications", Some(CRON_SECRET)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reminders"]["pruned"], 0);
    assert!(body.get("balances").is_none());

    let (status, body) = send(
        &app,
        cron_request("/api/cron/daily?job=backup", Some(CRON_SECRET)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}
