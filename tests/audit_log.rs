//! Security audit records as emitted through `tracing`.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};
use tracing_subscriber::fmt::MakeWriter;

use storefront_guard::observability::audit::AUDIT_TARGET;
use storefront_guard::sanitize::log::{MAX_IP_LEN, MAX_USER_AGENT_LEN};

use common::{json_request, login, send, test_app, EMAIL};

mod common;

/// In-memory log sink shared between the subscriber and the test.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Audit records written so far, parsed from the JSON log lines.
    fn audit_records(&self) -> Vec<Value> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .filter(|record| record["target"] == AUDIT_TARGET)
            .collect()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn capture() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_writer(logs.clone())
        .with_max_level(tracing::Level::INFO)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}

fn assert_single_line(record: &Value) {
    for field in ["path", "ip", "user_agent", "subject", "request_id"] {
        let value = record["fields"][field].as_str().unwrap_or_default();
        assert!(!value.contains('\n') && !value.contains('\r'), "{field}: {value:?}");
    }
}

#[tokio::test]
async fn test_csrf_rejection_writes_one_audit_record() {
    let (logs, _guard) = capture();
    let app = test_app();

    let long_agent = format!("Mozilla/5.0 {}", "x".repeat(400));
    let long_ip = format!("{}, 10.0.0.1", "2".repeat(120));
    let res = send(
        &app.router,
        json_request(
            Method::POST,
            "/api/echo%0d%0a%5BINFO%5D%20forged",
            &json!({ "qty": 1 }),
            &[("user-agent", long_agent), ("x-forwarded-for", long_ip)],
        ),
    )
    .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let records = logs.audit_records();
    assert_eq!(records.len(), 1, "{records:?}");
    let record = &records[0];
    assert_eq!(record["level"], "WARN");
    assert_eq!(record["fields"]["event"], "csrf_token_missing");
    assert_eq!(record["fields"]["severity"], "MEDIUM");
    assert_eq!(record["fields"]["method"], "POST");
    assert_eq!(record["fields"]["path"], "/api/echo%0d%0a%5BINFO%5D%20forged");

    let ip = record["fields"]["ip"].as_str().unwrap();
    assert!(ip.chars().count() <= MAX_IP_LEN + 3);
    let user_agent = record["fields"]["user_agent"].as_str().unwrap();
    assert!(user_agent.starts_with("Mozilla/5.0"));
    assert!(user_agent.chars().count() <= MAX_USER_AGENT_LEN + 3);
    assert_single_line(record);
}

#[tokio::test]
async fn test_failed_logins_write_one_record_each() {
    let (logs, _guard) = capture();
    let app = test_app();

    for _ in 0..5 {
        let res = login(&app.router, EMAIL, "wrong").await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    }

    let records = logs.audit_records();
    let events: Vec<&str> = records
        .iter()
        .map(|r| r["fields"]["event"].as_str().unwrap())
        .collect();
    assert_eq!(
        events,
        vec!["login_failed", "login_failed", "login_failed", "login_failed", "account_locked"]
    );
    assert_eq!(records[0]["fields"]["severity"], "LOW");
    assert_eq!(records[4]["fields"]["severity"], "MEDIUM");
    assert_eq!(records[4]["fields"]["subject"], EMAIL);
    assert!(records.iter().all(|r| !r.to_string().contains("wrong")));

    let res = login(&app.router, EMAIL, "wrong").await;
    assert_eq!(res.body["error_code"], "TOO_MANY_ATTEMPTS");
    let records = logs.audit_records();
    assert_eq!(records.len(), 6);
    assert_eq!(records[5]["fields"]["event"], "login_while_locked");
    records.iter().for_each(assert_single_line);
}

#[tokio::test]
async fn test_injected_subject_stays_on_one_line() {
    let (logs, _guard) = capture();
    let app = test_app();

    let res = login(&app.router, "eve@example.com\r\n[WARN] admin unlocked", "x").await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let records = logs.audit_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["fields"]["event"], "login_failed");
    assert_single_line(&records[0]);
}
