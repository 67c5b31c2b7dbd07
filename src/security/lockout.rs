//! Failed-login tracking and temporary account lockout.
//!
//! Counts failed logins per normalized email. Once `max_attempts` failures
//! accumulate inside the lockout window the account is refused until
//! `lockout_duration` has passed since the last failure. Records expire
//! lazily on read, and the sweeper removes abandoned ones.
//!
//! State is process-local. Several instances behind a load balancer each
//! keep their own counts, so an attacker spread across instances gets
//! `max_attempts` tries per instance.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::config::LockoutConfig;
use crate::security::clock::Clock;

/// Lockout thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    pub max_attempts: u32,
    pub lockout_duration: Duration,
}

impl LockoutPolicy {
    fn is_expired(&self, record: &LockoutRecord, now: Instant) -> bool {
        now.saturating_duration_since(record.last_attempt_at) > self.lockout_duration
    }
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self::from(&LockoutConfig::default())
    }
}

impl From<&LockoutConfig> for LockoutPolicy {
    fn from(config: &LockoutConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            lockout_duration: Duration::from_secs(config.lockout_duration_secs),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct LockoutRecord {
    attempt_count: u32,
    last_attempt_at: Instant,
}

/// Per-email failed login bookkeeping.
#[derive(Debug)]
pub struct LoginAttemptGuard {
    records: DashMap<String, LockoutRecord>,
    policy: LockoutPolicy,
    clock: Arc<dyn Clock>,
}

/// Lowercased, trimmed email used as the record key.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl LoginAttemptGuard {
    pub fn new(policy: LockoutPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            records: DashMap::new(),
            policy,
            clock,
        }
    }

    pub fn policy(&self) -> LockoutPolicy {
        self.policy
    }

    /// Current failure count, dropping the record if its window has passed.
    pub fn attempts(&self, email: &str) -> u32 {
        let key = normalize_email(email);
        let now = self.clock.now();

        let expired = match self.records.get(&key) {
            None => return 0,
            Some(record) if self.policy.is_expired(&record, now) => true,
            Some(record) => return record.attempt_count,
        };

        if expired {
            self.records
                .remove_if(&key, |_, record| self.policy.is_expired(record, now));
        }
        0
    }

    /// Whether logins for this email are currently refused.
    pub fn is_locked(&self, email: &str) -> bool {
        self.attempts(email) >= self.policy.max_attempts
    }

    /// Failures left before lockout.
    pub fn remaining_attempts(&self, email: &str) -> u32 {
        self.policy.max_attempts.saturating_sub(self.attempts(email))
    }

    /// Record a failed login and return the updated count.
    ///
    /// A failure after the previous window has expired starts a new count
    /// instead of adding to the stale one.
    pub fn record_failure(&self, email: &str) -> u32 {
        let now = self.clock.now();
        let mut record = self
            .records
            .entry(normalize_email(email))
            .or_insert(LockoutRecord {
                attempt_count: 0,
                last_attempt_at: now,
            });

        if self.policy.is_expired(&record, now) {
            record.attempt_count = 0;
        }
        record.attempt_count = record.attempt_count.saturating_add(1);
        record.last_attempt_at = now;
        record.attempt_count
    }

    /// Forget all failures for this email. Returns whether a record existed.
    pub fn clear(&self, email: &str) -> bool {
        self.records.remove(&normalize_email(email)).is_some()
    }

    /// Remove every expired record. Returns how many were dropped.
    pub fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        let mut removed = 0;
        self.records.retain(|_, record| {
            let keep = !self.policy.is_expired(record, now);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Number of emails with at least one tracked failure.
    pub fn tracked(&self) -> usize {
        self.records.len()
    }

    /// Number of emails currently over the threshold and inside the window.
    pub fn locked_count(&self) -> usize {
        let now = self.clock.now();
        self.records
            .iter()
            .filter(|entry| {
                let record = entry.value();
                !self.policy.is_expired(record, now)
                    && record.attempt_count >= self.policy.max_attempts
            })
            .count()
    }
}
