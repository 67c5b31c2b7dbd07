//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GuardConfig (validated, immutable)
//!     → shared via ArcSwap to middleware and handlers
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → AppState::apply_config swaps config and sanitizer
//!     → next request observes new policy
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Store TTLs and lockout policy are fixed at startup; a reload
//!   does not rewrite state already held in memory

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, CsrfConfig, Environment, GuardConfig, ListenerConfig, LockoutConfig, LogFormat,
    ObservabilityConfig, SanitizeConfig, SecurityConfig, SessionConfig, TimeoutConfig, UserConfig,
};
pub use validation::{normalize_origin, validate_config, ValidationError};
