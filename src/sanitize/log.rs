//! Log-line sanitization and sensitive field redaction.
//!
//! Anything user-supplied that ends up in a log line goes through here first:
//! line breaks are flattened so a value cannot forge a new log entry, and
//! structured payloads have secrets replaced before serialization.

use serde_json::{Map, Value};

/// Replacement for redacted values.
pub const REDACTED: &str = "[REDACTED]";

/// Upper bound for a single sanitized log field, in characters.
pub const MAX_LOG_FIELD_LEN: usize = 512;

/// Longest textual IP address (IPv4-mapped IPv6).
pub const MAX_IP_LEN: usize = 45;

pub const MAX_USER_AGENT_LEN: usize = 128;

const MAX_REDACT_DEPTH: usize = 32;

/// Key fragments that mark a field as sensitive. Keys are compared after
/// lowercasing and removing `_` and `-`, so `api_key`, `apiKey` and `API-KEY`
/// all match `apikey`.
const SENSITIVE_KEY_FRAGMENTS: [&str; 10] = [
    "password",
    "passwd",
    "secret",
    "token",
    "authorization",
    "cookie",
    "apikey",
    "creditcard",
    "cardnumber",
    "cvv",
];

/// True if a field with this name must never be logged verbatim.
pub fn is_sensitive_key(key: &str) -> bool {
    let normalized: String = key
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect();
    SENSITIVE_KEY_FRAGMENTS
        .iter()
        .any(|fragment| normalized.contains(fragment))
}

/// Flatten CR/LF to spaces, drop other control characters and bound length.
pub fn sanitize_log_line(input: &str) -> String {
    bounded(input, MAX_LOG_FIELD_LEN)
}

/// Length-bounded, single-line client address for audit records.
pub fn sanitize_ip(ip: &str) -> String {
    bounded(ip, MAX_IP_LEN)
}

/// Length-bounded, single-line user agent for audit records.
pub fn sanitize_user_agent(user_agent: &str) -> String {
    bounded(user_agent, MAX_USER_AGENT_LEN)
}

fn bounded(input: &str, max_chars: usize) -> String {
    let mut out = String::with_capacity(input.len().min(max_chars));
    for (count, c) in input
        .chars()
        .filter_map(|c| match c {
            '\r' | '\n' => Some(' '),
            c if c.is_control() => None,
            c => Some(c),
        })
        .enumerate()
    {
        if count >= max_chars {
            out.push_str("...");
            break;
        }
        out.push(c);
    }
    out
}

/// Return a copy of `value` with every sensitive field replaced by
/// [`REDACTED`]. Nesting deeper than the redaction limit is replaced as a
/// whole.
pub fn redact(value: &Value) -> Value {
    redact_at(value, 0)
}

fn redact_at(value: &Value, depth: usize) -> Value {
    if depth > MAX_REDACT_DEPTH {
        return Value::String(REDACTED.to_string());
    }
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, item) in map {
                let redacted = if is_sensitive_key(key) {
                    Value::String(REDACTED.to_string())
                } else {
                    redact_at(item, depth + 1)
                };
                out.insert(key.clone(), redacted);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| redact_at(v, depth + 1)).collect()),
        other => other.clone(),
    }
}

/// Serialize a structured log payload with secrets redacted.
pub fn to_log_string(value: &Value) -> String {
    match serde_json::to_string(&redact(value)) {
        Ok(serialized) => sanitize_log_line(&serialized),
        Err(_) => REDACTED.to_string(),
    }
}
