//! Input sanitization subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request value:
//!     → detect.rs (injection heuristics on the raw value, reject on hit)
//!     → chain.rs (structural walk over JSON / urlencoded / text)
//!         → rules.rs (strip control → strip SQL meta → escape HTML → truncate)
//!         → filename.rs (for filename fields instead of the text rules)
//!     → rewritten value handed to the route handler
//!
//! Outbound log value:
//!     → log.rs (flatten line breaks, bound length, redact secrets)
//! ```
//!
//! # Design Decisions
//! - Rules are pure and idempotent; `sanitize(sanitize(s)) == sanitize(s)`
//! - Sanitizing never fails; unhandled shapes degrade to a placeholder
//! - Detection runs before rewriting so escaped payloads are still caught

pub mod chain;
pub mod detect;
pub mod filename;
pub mod log;
pub mod rules;

pub use chain::InputSanitizer;
pub use detect::{detect_sql_injection, detect_xss, ThreatKind};
pub use filename::sanitize_filename;
pub use log::{redact, sanitize_log_line, to_log_string};

/// Sanitize a single string with the default request chain.
pub fn sanitize(input: &str) -> String {
    InputSanitizer::default().sanitize_str(input)
}
