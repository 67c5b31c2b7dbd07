//! Anti-CSRF token store.
//!
//! Two schemes are supported:
//! - Session-bound tokens, kept server-side with one live token per session.
//!   Tokens stay valid until they expire or are removed; a successful
//!   validation does not consume them.
//! - Double-submit tokens, which are stateless: the same random value is set
//!   as a cookie and echoed by client script in a header.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::security::clock::Clock;
use crate::security::token::{constant_time_eq, generate_token};

#[derive(Debug, Clone)]
struct CsrfTokenEntry {
    token: String,
    issued_at: Instant,
    expires_at: Instant,
}

impl CsrfTokenEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-memory CSRF token store keyed by session id.
#[derive(Debug)]
pub struct CsrfTokenStore {
    tokens: DashMap<String, CsrfTokenEntry>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl CsrfTokenStore {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            tokens: DashMap::new(),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `session_id`, replacing any previous one.
    pub fn generate_token(&self, session_id: &str) -> String {
        let now = self.clock.now();
        let token = generate_token();
        self.tokens.insert(
            session_id.to_string(),
            CsrfTokenEntry {
                token: token.clone(),
                issued_at: now,
                expires_at: now + self.ttl,
            },
        );
        token
    }

    /// Check `provided` against the live token for `session_id`.
    pub fn validate_token(&self, session_id: &str, provided: &str) -> bool {
        if provided.is_empty() {
            return false;
        }
        let now = self.clock.now();

        let matched = match self.tokens.get(session_id) {
            None => return false,
            Some(entry) if entry.is_expired(now) => None,
            Some(entry) => Some(constant_time_eq(&entry.token, provided)),
        };

        match matched {
            Some(valid) => valid,
            None => {
                self.tokens
                    .remove_if(session_id, |_, entry| entry.is_expired(now));
                false
            }
        }
    }

    /// Drop the token for `session_id`. Returns whether one existed.
    pub fn remove_token(&self, session_id: &str) -> bool {
        self.tokens.remove(session_id).is_some()
    }

    /// Age of the live token for `session_id`, if any.
    pub fn token_age(&self, session_id: &str) -> Option<Duration> {
        let now = self.clock.now();
        self.tokens
            .get(session_id)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| now.saturating_duration_since(entry.issued_at))
    }

    /// Fresh token for the stateless double-submit scheme.
    pub fn generate_double_submit_token() -> String {
        generate_token()
    }

    /// Double-submit check: both values present and equal.
    pub fn validate_double_submit_token(cookie_token: &str, header_token: &str) -> bool {
        !cookie_token.is_empty()
            && !header_token.is_empty()
            && constant_time_eq(cookie_token, header_token)
    }

    /// Remove every expired token. Returns how many were dropped.
    pub fn cleanup_expired_tokens(&self) -> usize {
        let now = self.clock.now();
        let mut removed = 0;
        self.tokens.retain(|_, entry| {
            let keep = !entry.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Number of stored tokens, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
