//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Login request:
//!     → lockout.rs (refuse while locked)
//!     → credentials.rs (verify email/password)
//!     → lockout.rs (record failure or clear on success)
//!     → session.rs (start session) → csrf.rs (issue session-bound token)
//!
//! State-changing request:
//!     → csrf.rs (double-submit, or session-bound token lookup)
//!
//! Background:
//!     sweeper.rs → expire lockouts, tokens and idle sessions
//! ```
//!
//! # Design Decisions
//! - Stores are injectable services behind method-only APIs; raw maps never leak
//! - Every expiry check reads an injected clock
//! - Secrets are compared in constant time
//! - Fail closed: any failed check rejects the request

pub mod clock;
pub mod credentials;
pub mod csrf;
pub mod lockout;
pub mod session;
pub mod sweeper;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use credentials::{CredentialVerifier, StaticCredentials};
pub use csrf::CsrfTokenStore;
pub use lockout::{LockoutPolicy, LoginAttemptGuard};
pub use session::SessionStore;
