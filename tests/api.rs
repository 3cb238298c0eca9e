use account_service::{
    app::build_app,
    auth::policy::{PasswordPolicy, UserPolicy},
    config::{AppConfig, JwtConfig},
    db,
    state::AppState,
};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_config(dev_endpoints: bool) -> AppConfig {
    AppConfig {
        host: "127.0.0.1".into(),
        port: 0,
        database_url: "sqlite::memory:".into(),
        jwt: JwtConfig {
            secret: "test-secret-key-for-jwt-signing-at-least-32-bytes".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 60,
            refresh_ttl_minutes: 120,
            leeway_secs: 0,
        },
        password: PasswordPolicy::default(),
        user: UserPolicy::default(),
        dev_endpoints,
    }
}

async fn spawn_app(dev_endpoints: bool) -> Router {
    let pool = db::connect_in_memory().await.expect("in-memory db");
    db::run_migrations(&pool).await.expect("migrations");
    let state = AppState::from_parts(pool, test_config(dev_endpoints)).expect("state");
    build_app(state)
}

async fn read_body(res: axum::response::Response) -> (StatusCode, Value) {
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, value)
}

async fn send_raw(app: &Router, uri: &str, body: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    read_body(app.clone().oneshot(req).await.unwrap()).await
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    token: Option<&str>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
        Some(body) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    read_body(app.clone().oneshot(req).await.unwrap()).await
}

async fn register(app: &Router, username: &str, email: &str, password: &str) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/register",
        Some(json!({ "username": username, "email": email, "password": password })),
        None,
    )
    .await
}

async fn login(app: &Router, username: &str, password: &str) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/login",
        Some(json!({ "username": username, "password": password })),
        None,
    )
    .await
}

#[tokio::test]
async fn register_login_and_fetch_me() {
    let app = spawn_app(false).await;

    let (status, user) = register(&app, "alice", "alice@example.com", "abcd").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["username"], "alice");
    assert_eq!(user["email_confirmed"], false);
    assert!(user.get("password_hash").is_none());

    let (status, tokens) = login(&app, "alice", "abcd").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tokens["token_type"], "Bearer");
    assert_eq!(tokens["expires_in"], 3600);
    let access = tokens["access_token"].as_str().unwrap();

    let (status, me) = send(&app, Method::GET, "/me", None, Some(access)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], user["id"]);
    assert_eq!(me["two_factor_enabled"], false);

    let (status, hello) = send(&app, Method::GET, "/", None, Some(access)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hello, "hello alice");
}

#[tokio::test]
async fn duplicate_registration_is_bad_request() {
    let app = spawn_app(false).await;
    register(&app, "alice", "alice@example.com", "abcd").await;

    let (status, body) = register(&app, "alice", "second@example.com", "abcd").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "DuplicateUser");

    let (status, body) = register(&app, "bob", "ALICE@example.com", "abcd").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "DuplicateUser");
}

#[tokio::test]
async fn weak_password_names_failed_rule() {
    let app = spawn_app(false).await;
    let (status, body) = register(&app, "alice", "alice@example.com", "ab").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "WeakPassword");
    assert_eq!(body["failed_rules"], json!(["PasswordTooShort"]));
}

#[tokio::test]
async fn bad_login_is_indistinguishable() {
    let app = spawn_app(false).await;
    register(&app, "alice", "alice@example.com", "abcd").await;

    let wrong_password = login(&app, "alice", "wxyz").await;
    let unknown_user = login(&app, "mallory", "abcd").await;
    assert_eq!(wrong_password.0, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password, unknown_user);
    assert_eq!(wrong_password.1["code"], "InvalidCredentials");
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let app = spawn_app(false).await;

    let (status, body) = send(&app, Method::GET, "/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "InvalidToken");

    let (status, _) = send(&app, Method::GET, "/me", None, Some("garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_issues_a_working_access_token() {
    let app = spawn_app(false).await;
    register(&app, "alice", "alice@example.com", "abcd").await;
    let (_, tokens) = login(&app, "alice", "abcd").await;
    let refresh_token = tokens["refresh_token"].as_str().unwrap();

    // refresh tokens are not bearer credentials
    let (status, _) = send(&app, Method::GET, "/me", None, Some(refresh_token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, renewed) = send(
        &app,
        Method::POST,
        "/refresh",
        Some(json!({ "refresh_token": refresh_token })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let access = renewed["access_token"].as_str().unwrap();
    let (status, me) = send(&app, Method::GET, "/me", None, Some(access)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "alice");
}

#[tokio::test]
async fn malformed_bodies_get_a_coded_bad_request() {
    let app = spawn_app(false).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/register",
        Some(json!({ "username": "alice" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "InvalidRequest");
    assert!(body["message"].as_str().unwrap().contains("email"));

    let (status, body) = send_raw(&app, "/login", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "InvalidRequest");

    let req = Request::builder()
        .method(Method::POST)
        .uri("/refresh")
        .body(Body::from("{}"))
        .unwrap();
    let (status, body) = read_body(app.clone().oneshot(req).await.unwrap()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "InvalidRequest");
}

async fn access_token(app: &Router, username: &str, password: &str) -> String {
    let (status, tokens) = login(app, username, password).await;
    assert_eq!(status, StatusCode::OK);
    tokens["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn manage_info_changes_email_and_password() {
    let app = spawn_app(false).await;
    register(&app, "alice", "alice@example.com", "abcd").await;
    let access = access_token(&app, "alice", "abcd").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/manage/info",
        Some(json!({
            "new_email": "alice@new.example.com",
            "new_password": "wxyz",
            "old_password": "abcd",
        })),
        Some(&access),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "alice@new.example.com");

    let (status, _) = login(&app, "alice", "abcd").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let access = access_token(&app, "alice", "wxyz").await;

    let (_, info) = send(&app, Method::GET, "/manage/info", None, Some(&access)).await;
    assert_eq!(info["email"], "alice@new.example.com");
    assert_eq!(info["two_factor_enabled"], false);
}

#[tokio::test]
async fn manage_info_guards_password_and_email() {
    let app = spawn_app(false).await;
    register(&app, "bob", "bob@example.com", "abcd").await;
    register(&app, "alice", "alice@example.com", "abcd").await;
    let access = access_token(&app, "alice", "abcd").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/manage/info",
        Some(json!({ "new_password": "wxyz", "old_password": "nope" })),
        Some(&access),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "InvalidCredentials");

    let (status, body) = send(
        &app,
        Method::POST,
        "/manage/info",
        Some(json!({ "new_password": "wxyz" })),
        Some(&access),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "InvalidRequest");

    let (status, body) = send(
        &app,
        Method::POST,
        "/manage/info",
        Some(json!({ "new_email": "bob@example.com" })),
        Some(&access),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "DuplicateUser");

    let (status, _) = send(
        &app,
        Method::POST,
        "/manage/info",
        Some(json!({ "new_email": "bob@example.com" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    access_token(&app, "alice", "abcd").await;
}

#[tokio::test]
async fn two_factor_flag_has_no_toggle_route() {
    let app = spawn_app(false).await;
    register(&app, "alice", "alice@example.com", "abcd").await;
    let access = access_token(&app, "alice", "abcd").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/manage/2fa",
        Some(json!({ "enable": true })),
        Some(&access),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn login_username_is_case_insensitive() {
    let app = spawn_app(false).await;
    register(&app, "alice", "alice@example.com", "abcd").await;

    let access = access_token(&app, "Alice", "abcd").await;
    let (_, me) = send(&app, Method::GET, "/me", None, Some(&access)).await;
    assert_eq!(me["username"], "alice");
}

#[tokio::test]
async fn migrate_is_hidden_unless_dev_endpoints_enabled() {
    let app = spawn_app(false).await;
    let (status, _) = send(&app, Method::POST, "/migrate", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn migrate_recreates_schema() {
    let app = spawn_app(true).await;
    register(&app, "alice", "alice@example.com", "abcd").await;

    let (status, body) = send(&app, Method::POST, "/migrate", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "schema recreated");

    let (status, _) = login(&app, "alice", "abcd").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = register(&app, "alice", "alice@example.com", "abcd").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn health_is_public() {
    let app = spawn_app(false).await;
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}
