//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the guard
//! service. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the guard service.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct GuardConfig {
    /// Deployment environment; production turns on `Secure` cookies.
    pub environment: Environment,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Failed-login lockout policy.
    pub lockout: LockoutConfig,

    /// CSRF token and origin policy.
    pub csrf: CsrfConfig,

    /// Login session settings.
    pub session: SessionConfig,

    /// Input sanitization settings.
    pub sanitize: SanitizeConfig,

    /// Request size limits.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin endpoints.
    pub admin: AdminConfig,

    /// Users accepted by the bundled credential verifier.
    pub users: Vec<UserConfig>,
}

impl GuardConfig {
    /// Whether cookies must carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        self.environment == Environment::Production
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Failed-login lockout policy.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LockoutConfig {
    /// Failures inside the window before the account is locked.
    pub max_attempts: u32,

    /// Window length, measured from the latest failure, in seconds.
    pub lockout_duration_secs: u64,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lockout_duration_secs: 15 * 60,
        }
    }
}

/// CSRF protection configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CsrfConfig {
    /// Lifetime of session-bound tokens and of the double-submit cookie.
    pub token_ttl_secs: u64,

    /// Name of the double-submit cookie. Must stay readable by client script.
    pub cookie_name: String,

    /// Request headers accepted as the echoed token, checked in order.
    pub header_names: Vec<String>,

    /// Path prefixes exempt from CSRF checks.
    pub skip_paths: Vec<String>,

    /// Origins allowed for bearer-token API calls (scheme://host[:port]).
    pub allowed_origins: Vec<String>,

    /// Interval of the background expiry sweep, in seconds.
    pub cleanup_interval_secs: u64,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            token_ttl_secs: 3600,
            cookie_name: "XSRF-TOKEN".to_string(),
            header_names: vec!["x-csrf-token".to_string(), "x-xsrf-token".to_string()],
            skip_paths: vec![
                "/health".to_string(),
                "/auth/login".to_string(),
                "/csrf/token".to_string(),
            ],
            allowed_origins: vec!["http://localhost:3000".to_string()],
            cleanup_interval_secs: 300,
        }
    }
}

/// Login session configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Cookie carrying the session id (HttpOnly).
    pub cookie_name: String,

    /// Sessions idle for longer than this are dropped, in seconds.
    pub idle_ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "sid".to_string(),
            idle_ttl_secs: 8 * 60 * 60,
        }
    }
}

/// Input sanitization configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SanitizeConfig {
    /// Rewrite request body and query before handlers run.
    pub enabled: bool,

    /// Reject requests whose raw input matches an injection heuristic.
    pub detect_injection: bool,

    /// Strings are cut to this many characters.
    pub max_string_length: usize,

    /// JSON nesting beyond this depth is replaced by `null`.
    pub max_depth: usize,

    /// Strip SQL comment markers and backslashes from strings.
    pub strip_sql_meta: bool,

    /// Field names left untouched (case-insensitive).
    pub skip_fields: Vec<String>,

    /// Field names normalized as filenames (case-insensitive).
    pub filename_fields: Vec<String>,

    /// Identifier fields compared verbatim downstream, such as the login
    /// email (case-insensitive). Scanned, but only control characters and
    /// excess length are removed.
    pub identity_fields: Vec<String>,

    /// Path prefixes that bypass sanitization entirely.
    pub exempt_paths: Vec<String>,
}

impl Default for SanitizeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            detect_injection: true,
            max_string_length: 10_000,
            max_depth: 32,
            strip_sql_meta: true,
            skip_fields: vec![
                "password".to_string(),
                "currentPassword".to_string(),
                "newPassword".to_string(),
                "confirmPassword".to_string(),
            ],
            filename_fields: vec!["filename".to_string(), "fileName".to_string()],
            identity_fields: vec!["email".to_string()],
            exempt_paths: Vec::new(),
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Placeholder admin key; validation refuses it when the admin API is on.
pub const PLACEHOLDER_API_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

/// Admin endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AdminConfig {
    /// Mount the `/admin` routes.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_API_KEY.to_string(),
        }
    }
}

/// A user accepted by the bundled credential verifier.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct UserConfig {
    pub email: String,

    /// Hex-encoded SHA-256 digest of the password.
    pub password_sha256: String,
}
