//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower::ServiceExt;

use storefront_guard::config::{GuardConfig, UserConfig};
use storefront_guard::http::{AppState, HttpServer};
use storefront_guard::lifecycle::Shutdown;
use storefront_guard::security::credentials::password_digest_hex;
use storefront_guard::security::ManualClock;

pub const EMAIL: &str = "shopper@example.com";
pub const PASSWORD: &str = "correct horse battery";
pub const ADMIN_KEY: &str = "test-admin-key-0123456789";

pub fn test_config() -> GuardConfig {
    let mut config = GuardConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.admin.enabled = true;
    config.admin.api_key = ADMIN_KEY.to_string();
    config.users.push(UserConfig {
        email: EMAIL.to_string(),
        password_sha256: password_digest_hex(PASSWORD),
    });
    config
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub clock: ManualClock,
}

pub fn test_app() -> TestApp {
    test_app_with(test_config())
}

pub fn test_app_with(config: GuardConfig) -> TestApp {
    let clock = ManualClock::new();
    let state = AppState::with_clock(config, Arc::new(clock.clone()));
    let server = HttpServer::with_state(state.clone());
    TestApp {
        router: server.router(),
        state,
        clock,
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// Value of a cookie set by this response.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|v| {
                let (pair, _) = v.split_once(';').unwrap_or((v, ""));
                let (n, value) = pair.split_once('=')?;
                (n == name).then(|| value.to_string())
            })
    }

    pub fn set_cookie_header(&self, name: &str) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with(&format!("{}=", name)))
            .map(str::to_string)
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> TestResponse {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    TestResponse { status, headers, body }
}

/// JSON request with extra headers.
pub fn json_request(
    method: Method,
    uri: &str,
    body: &Value,
    headers: &[(&str, String)],
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, value.as_str());
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn login(router: &Router, email: &str, password: &str) -> TestResponse {
    let body = serde_json::json!({ "email": email, "password": password });
    send(router, json_request(Method::POST, "/auth/login", &body, &[])).await
}

/// Log in and return `(session id, session-bound CSRF token)`.
pub async fn login_ok(router: &Router) -> (String, String) {
    let res = login(router, EMAIL, PASSWORD).await;
    assert_eq!(res.status, StatusCode::OK, "login failed: {:?}", res.body);
    let sid = res.cookie("sid").expect("session cookie");
    let token = res.body["csrf_token"].as_str().expect("csrf token").to_string();
    (sid, token)
}

/// Start a real server on an ephemeral port.
pub async fn start_server(
    config: GuardConfig,
) -> (SocketAddr, Shutdown, mpsc::UnboundedSender<GuardConfig>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let (updates_tx, updates_rx) = mpsc::unbounded_channel();
    let server = HttpServer::new(config);
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, updates_rx, server_shutdown).await;
    });

    (addr, shutdown, updates_tx)
}
