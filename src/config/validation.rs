//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, thresholds > 0)
//! - Check origins, cookie and header names are well formed
//! - Refuse placeholder secrets when the admin API is enabled
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GuardConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::HeaderName;
use url::Url;

use crate::config::schema::{GuardConfig, PLACEHOLDER_API_KEY};

const MIN_API_KEY_LEN: usize = 16;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Normalize an origin (`scheme://host[:port]`) for comparison.
///
/// Returns `None` for anything that is not a bare http(s) origin.
pub fn normalize_origin(origin: &str) -> Option<String> {
    let url = Url::parse(origin.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }
    if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
        return None;
    }
    Some(url.origin().ascii_serialization())
}

fn is_cookie_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b))
}

pub fn validate_config(config: &GuardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            "must be a socket address like 0.0.0.0:8080",
        ));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.lockout.max_attempts == 0 {
        errors.push(ValidationError::new("lockout.max_attempts", "must be greater than 0"));
    }
    if config.lockout.lockout_duration_secs == 0 {
        errors.push(ValidationError::new(
            "lockout.lockout_duration_secs",
            "must be greater than 0",
        ));
    }

    let csrf = &config.csrf;
    if csrf.token_ttl_secs == 0 {
        errors.push(ValidationError::new("csrf.token_ttl_secs", "must be greater than 0"));
    }
    if csrf.cleanup_interval_secs == 0 {
        errors.push(ValidationError::new(
            "csrf.cleanup_interval_secs",
            "must be greater than 0",
        ));
    }
    if !is_cookie_name(&csrf.cookie_name) {
        errors.push(ValidationError::new("csrf.cookie_name", "is not a valid cookie name"));
    }
    if csrf.header_names.is_empty() {
        errors.push(ValidationError::new("csrf.header_names", "must list at least one header"));
    }
    for name in &csrf.header_names {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::new(
                "csrf.header_names",
                format!("'{}' is not a valid header name", name),
            ));
        }
    }
    for origin in &csrf.allowed_origins {
        if normalize_origin(origin).is_none() {
            errors.push(ValidationError::new(
                "csrf.allowed_origins",
                format!("'{}' is not an http(s) origin", origin),
            ));
        }
    }

    if !is_cookie_name(&config.session.cookie_name) {
        errors.push(ValidationError::new("session.cookie_name", "is not a valid cookie name"));
    }
    if config.session.cookie_name == csrf.cookie_name {
        errors.push(ValidationError::new(
            "session.cookie_name",
            "must differ from csrf.cookie_name",
        ));
    }
    if config.session.idle_ttl_secs == 0 {
        errors.push(ValidationError::new("session.idle_ttl_secs", "must be greater than 0"));
    }

    if config.sanitize.max_string_length == 0 {
        errors.push(ValidationError::new(
            "sanitize.max_string_length",
            "must be greater than 0",
        ));
    }
    if config.sanitize.max_depth == 0 {
        errors.push(ValidationError::new("sanitize.max_depth", "must be greater than 0"));
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new("security.max_body_size", "must be greater than 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "must be a socket address",
        ));
    }
    if !matches!(
        config.observability.log_level.as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        errors.push(ValidationError::new(
            "observability.log_level",
            "must be one of trace, debug, info, warn, error",
        ));
    }

    if config.admin.enabled
        && (config.admin.api_key == PLACEHOLDER_API_KEY || config.admin.api_key.len() < MIN_API_KEY_LEN)
    {
        errors.push(ValidationError::new(
            "admin.api_key",
            format!("must be set to a secret of at least {} characters", MIN_API_KEY_LEN),
        ));
    }

    for (i, user) in config.users.iter().enumerate() {
        if !user.email.contains('@') {
            errors.push(ValidationError::new(
                format!("users[{}].email", i),
                "must be an email address",
            ));
        }
        let digest = user.password_sha256.trim();
        if digest.len() != 64 || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
            errors.push(ValidationError::new(
                format!("users[{}].password_sha256", i),
                "must be a 64 character hex SHA-256 digest",
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::UserConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&GuardConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = GuardConfig::default();
        config.lockout.max_attempts = 0;
        config.csrf.token_ttl_secs = 0;
        config.csrf.allowed_origins.push("not a url".to_string());
        config.csrf.header_names.push("bad header".to_string());

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "lockout.max_attempts",
                "csrf.token_ttl_secs",
                "csrf.header_names",
                "csrf.allowed_origins"
            ]
        );
    }

    #[test]
    fn test_admin_requires_real_key() {
        let mut config = GuardConfig::default();
        config.admin.enabled = true;
        assert!(validate_config(&config).is_err());

        config.admin.api_key = "a-long-enough-admin-secret".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_user_digest_format() {
        let mut config = GuardConfig::default();
        config.users.push(UserConfig {
            email: "a@b.com".to_string(),
            password_sha256: "abc".to_string(),
        });
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "users[0].password_sha256");
        assert_eq!(
            errors[0].to_string(),
            "users[0].password_sha256: must be a 64 character hex SHA-256 digest"
        );
    }

    #[test]
    fn test_normalize_origin() {
        assert_eq!(
            normalize_origin("https://Shop.Example.com"),
            Some("https://shop.example.com".to_string())
        );
        assert_eq!(
            normalize_origin("http://localhost:3000/"),
            Some("http://localhost:3000".to_string())
        );
        assert_eq!(
            normalize_origin("https://shop.example.com:443"),
            Some("https://shop.example.com".to_string())
        );
        assert_eq!(normalize_origin("https://shop.example.com/path"), None);
        assert_eq!(normalize_origin("ftp://shop.example.com"), None);
        assert_eq!(normalize_origin("null"), None);
    }
}
