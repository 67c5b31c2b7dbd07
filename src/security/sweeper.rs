//! Periodic expiry sweep for the in-memory guard stores.
//!
//! Expiry is also enforced lazily on every read; the sweep only bounds
//! memory held by sessions, tokens and lockout records nobody reads again.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::observability::metrics;
use crate::security::csrf::CsrfTokenStore;
use crate::security::lockout::LoginAttemptGuard;
use crate::security::session::SessionStore;

pub struct StoreSweeper {
    login_guard: Arc<LoginAttemptGuard>,
    csrf_store: Arc<CsrfTokenStore>,
    sessions: Arc<SessionStore>,
    interval: Duration,
}

/// Counts removed by one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub lockouts: usize,
    pub csrf_tokens: usize,
    pub sessions: usize,
}

impl StoreSweeper {
    pub fn new(
        login_guard: Arc<LoginAttemptGuard>,
        csrf_store: Arc<CsrfTokenStore>,
        sessions: Arc<SessionStore>,
        interval: Duration,
    ) -> Self {
        Self {
            login_guard,
            csrf_store,
            sessions,
            interval,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Store sweeper starting");

        let mut ticker = time::interval(self.interval);
        // The first tick completes immediately; nothing has expired yet.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.sweep_once();
                    if report != SweepReport::default() {
                        tracing::debug!(
                            lockouts = report.lockouts,
                            csrf_tokens = report.csrf_tokens,
                            sessions = report.sessions,
                            "Swept expired guard state"
                        );
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Store sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Run a single sweep over all stores.
    pub fn sweep_once(&self) -> SweepReport {
        let expired_sessions = self.sessions.cleanup_expired();
        for id in &expired_sessions {
            self.csrf_store.remove_token(id);
        }

        let report = SweepReport {
            lockouts: self.login_guard.cleanup_expired(),
            csrf_tokens: self.csrf_store.cleanup_expired_tokens(),
            sessions: expired_sessions.len(),
        };

        metrics::record_store_sizes(
            self.login_guard.tracked(),
            self.csrf_store.len(),
            self.sessions.len(),
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::clock::ManualClock;
    use crate::security::lockout::LockoutPolicy;

    #[test]
    fn test_sweep_drops_session_tokens_with_sessions() {
        let clock = ManualClock::new();
        let shared: Arc<dyn crate::security::clock::Clock> = Arc::new(clock.clone());
        let login_guard = Arc::new(LoginAttemptGuard::new(LockoutPolicy::default(), shared.clone()));
        let csrf_store = Arc::new(CsrfTokenStore::new(Duration::from_secs(7200), shared.clone()));
        let sessions = Arc::new(SessionStore::new(Duration::from_secs(600), shared));

        let sid = sessions.create("a@b.com");
        csrf_store.generate_token(&sid);
        login_guard.record_failure("x@b.com");

        let sweeper = StoreSweeper::new(
            login_guard.clone(),
            csrf_store.clone(),
            sessions.clone(),
            Duration::from_secs(60),
        );
        assert_eq!(sweeper.sweep_once(), SweepReport::default());

        clock.advance(Duration::from_secs(16 * 60));
        let report = sweeper.sweep_once();
        assert_eq!(report.sessions, 1);
        assert_eq!(report.lockouts, 1);
        assert!(csrf_store.is_empty());
        assert_eq!(login_guard.tracked(), 0);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let clock: Arc<dyn crate::security::clock::Clock> = Arc::new(ManualClock::new());
        let sweeper = StoreSweeper::new(
            Arc::new(LoginAttemptGuard::new(LockoutPolicy::default(), clock.clone())),
            Arc::new(CsrfTokenStore::new(Duration::from_secs(60), clock.clone())),
            Arc::new(SessionStore::new(Duration::from_secs(60), clock)),
            Duration::from_millis(10),
        );
        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(sweeper.run(rx));
        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper should exit")
            .unwrap();
    }
}
