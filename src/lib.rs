//! Storefront request guard library.
//!
//! Failed-login lockout, CSRF protection and input sanitization for an
//! axum storefront API, plus the service that hosts them.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod sanitize;
pub mod security;

pub use config::schema::GuardConfig;
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;
