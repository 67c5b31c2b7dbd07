//! CSRF policy through the HTTP surface.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::json;

use common::{json_request, login_ok, send, test_app, TestApp};

mod common;

async fn echo(app: &TestApp, headers: &[(&str, String)]) -> common::TestResponse {
    send(
        &app.router,
        json_request(Method::POST, "/api/echo", &json!({ "item": "sufuria" }), headers),
    )
    .await
}

async fn double_submit_token(app: &TestApp) -> String {
    let res = send(
        &app.router,
        Request::builder().uri("/csrf/token").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);
    let cookie = res.cookie("XSRF-TOKEN").unwrap();
    assert_eq!(res.body["csrf_token"], cookie.as_str());
    assert!(res.body.get("session_csrf_token").is_none());
    cookie
}

#[tokio::test]
async fn test_missing_token_is_forbidden() {
    let app = test_app();
    let res = echo(&app, &[]).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(
        res.body,
        json!({
            "success": false,
            "error": "CSRF token required",
            "error_code": "CSRF_TOKEN_MISSING"
        })
    );
}

#[tokio::test]
async fn test_csrf_cookie_attributes() {
    let app = test_app();
    let res = send(
        &app.router,
        Request::builder().uri("/csrf/token").body(Body::empty()).unwrap(),
    )
    .await;
    let cookie = res.set_cookie_header("XSRF-TOKEN").unwrap();
    assert!(!cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));
    assert!(cookie.contains("Max-Age=3600"));
}

#[tokio::test]
async fn test_double_submit() {
    let app = test_app();
    let token = double_submit_token(&app).await;

    let res = echo(
        &app,
        &[
            ("cookie", format!("XSRF-TOKEN={}", token)),
            ("x-csrf-token", token.clone()),
        ],
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"], json!({ "item": "sufuria" }));

    let res = echo(
        &app,
        &[
            ("cookie", format!("XSRF-TOKEN={}", token)),
            ("x-xsrf-token", token.clone()),
        ],
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);

    let res = echo(
        &app,
        &[
            ("cookie", format!("XSRF-TOKEN={}", token)),
            ("x-csrf-token", format!("{}x", token)),
        ],
    )
    .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body["error_code"], "CSRF_VALIDATION_FAILED");
}

#[tokio::test]
async fn test_session_token() {
    let app = test_app();
    let (sid, token) = login_ok(&app.router).await;

    let res = echo(
        &app,
        &[("cookie", format!("sid={}", sid)), ("x-csrf-token", token.clone())],
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);

    // Reusable until expiry.
    let res = echo(
        &app,
        &[("cookie", format!("sid={}", sid)), ("x-csrf-token", token.clone())],
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);

    let res = echo(&app, &[("cookie", format!("sid={}", sid))]).await;
    assert_eq!(res.body["error_code"], "CSRF_TOKEN_MISSING");

    let res = echo(&app, &[("x-csrf-token", token.clone())]).await;
    assert_eq!(res.body["error_code"], "CSRF_VALIDATION_FAILED");
}

#[tokio::test]
async fn test_session_token_ttl() {
    let app = test_app();
    let (sid, token) = login_ok(&app.router).await;
    let headers = [("cookie", format!("sid={}", sid)), ("x-csrf-token", token)];

    app.clock.set_elapsed(Duration::from_secs(3599));
    assert_eq!(echo(&app, &headers).await.status, StatusCode::OK);

    app.clock.set_elapsed(Duration::from_secs(3601));
    assert_eq!(echo(&app, &headers).await.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_logout_invalidates_session_token() {
    let app = test_app();
    let (sid, token) = login_ok(&app.router).await;
    let headers = [("cookie", format!("sid={}", sid)), ("x-csrf-token", token)];

    let res = send(
        &app.router,
        json_request(Method::POST, "/auth/logout", &json!({}), &headers),
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);
    let removal = res.set_cookie_header("sid").unwrap();
    assert!(removal.contains("Max-Age=0"));
    assert!(app.state.sessions.is_empty());
    assert!(app.state.csrf.is_empty());

    assert_eq!(echo(&app, &headers).await.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_token_endpoint_refreshes_session_token() {
    let app = test_app();
    let (sid, old_token) = login_ok(&app.router).await;

    let res = send(
        &app.router,
        Request::builder()
            .uri("/csrf/token")
            .header("cookie", format!("sid={}", sid))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    let new_token = res.body["session_csrf_token"].as_str().unwrap().to_string();
    assert_ne!(new_token, old_token);

    let stale = [("cookie", format!("sid={}", sid)), ("x-csrf-token", old_token)];
    assert_eq!(echo(&app, &stale).await.status, StatusCode::FORBIDDEN);

    let fresh = [("cookie", format!("sid={}", sid)), ("x-csrf-token", new_token)];
    assert_eq!(echo(&app, &fresh).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_bearer_calls_check_origin() {
    let app = test_app();
    let bearer = ("authorization", "Bearer client-api-token".to_string());

    let res = echo(&app, &[bearer.clone(), ("origin", "http://localhost:3000".to_string())]).await;
    assert_eq!(res.status, StatusCode::OK);

    let res = echo(&app, &[bearer.clone(), ("origin", "https://attacker.example".to_string())]).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body["error_code"], "ORIGIN_NOT_ALLOWED");

    let res = echo(
        &app,
        &[bearer.clone(), ("referer", "https://attacker.example/page".to_string())],
    )
    .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = echo(&app, &[bearer]).await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn test_safe_methods_and_skip_paths() {
    let app = test_app();

    let res = send(
        &app.router,
        Request::builder().uri("/api/echo?item=jiko").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["item"], "jiko");

    // Login is on the skip list; no token required.
    let res = common::login(&app.router, common::EMAIL, "wrong").await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_skip_paths_follow_config_reload() {
    let app = test_app();
    assert_eq!(echo(&app, &[]).await.status, StatusCode::FORBIDDEN);

    let mut config = common::test_config();
    config.csrf.skip_paths.push("/api/echo".to_string());
    app.state.apply_config(config);

    assert_eq!(echo(&app, &[]).await.status, StatusCode::OK);
}
