//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layers, graceful shutdown)
//!     → request.rs (request ID, cookies, origin, client address)
//!     → middleware/ (sanitize, CSRF)
//!     → handlers.rs / extract.rs (login, logout, token issue, echo)
//!     → error.rs (uniform JSON rejections)
//!     → Send to client
//! ```

pub mod cookies;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod request;
pub mod server;

pub use error::GuardError;
pub use extract::SanitizedParams;
pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
