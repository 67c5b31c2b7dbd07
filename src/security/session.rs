//! Login sessions.
//!
//! A session id is issued on successful login and carried in a cookie.
//! Session-bound CSRF tokens are keyed by this id.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use uuid::Uuid;

use crate::security::clock::Clock;

/// An authenticated session.
#[derive(Debug, Clone)]
pub struct Session {
    pub email: String,
    pub created_at: Instant,
    last_seen: Instant,
}

/// In-memory session table with an idle timeout.
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    idle_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    pub fn new(idle_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_ttl,
            clock,
        }
    }

    fn is_idle(&self, session: &Session, now: Instant) -> bool {
        now.saturating_duration_since(session.last_seen) > self.idle_ttl
    }

    /// Start a session for `email` and return its id.
    pub fn create(&self, email: &str) -> String {
        let now = self.clock.now();
        let id = Uuid::new_v4().simple().to_string();
        self.sessions.insert(
            id.clone(),
            Session {
                email: email.to_string(),
                created_at: now,
                last_seen: now,
            },
        );
        id
    }

    /// Look up a live session and refresh its idle timer.
    pub fn touch(&self, id: &str) -> Option<Session> {
        let now = self.clock.now();
        let live = match self.sessions.get_mut(id) {
            None => return None,
            Some(session) if self.is_idle(&session, now) => None,
            Some(mut session) => {
                session.last_seen = now;
                Some(session.clone())
            }
        };

        if live.is_none() {
            self.sessions
                .remove_if(id, |_, session| self.is_idle(session, now));
        }
        live
    }

    /// End a session. Returns the removed session, if it existed.
    pub fn remove(&self, id: &str) -> Option<Session> {
        self.sessions.remove(id).map(|(_, session)| session)
    }

    /// Drop idle sessions. Returns the ids removed so dependent state
    /// (CSRF tokens) can be dropped as well.
    pub fn cleanup_expired(&self) -> Vec<String> {
        let now = self.clock.now();
        let mut removed = Vec::new();
        self.sessions.retain(|id, session| {
            let keep = !self.is_idle(session, now);
            if !keep {
                removed.push(id.clone());
            }
            keep
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
