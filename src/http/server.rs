//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, timeout, body limit, guards)
//! - Apply configuration updates without restart
//! - Run the expiry sweeper alongside the server
//! - Bind server to listener and shut down gracefully

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::http::Request;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::admin;
use crate::config::GuardConfig;
use crate::http::handlers;
use crate::http::middleware::{csrf_middleware, sanitize_middleware, track_metrics};
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::sanitize::{sanitize_log_line, InputSanitizer};
use crate::security::sweeper::StoreSweeper;
use crate::security::{
    Clock, CredentialVerifier, CsrfTokenStore, LockoutPolicy, LoginAttemptGuard, SessionStore,
    StaticCredentials, SystemClock,
};

/// Application state injected into handlers and middleware.
#[derive(Clone)]
pub struct AppState {
    /// Current configuration; replaced atomically on reload.
    pub config: Arc<ArcSwap<GuardConfig>>,
    /// Sanitizer built from the current `[sanitize]` section.
    pub sanitizer: Arc<ArcSwap<InputSanitizer>>,
    pub login_guard: Arc<LoginAttemptGuard>,
    pub csrf: Arc<CsrfTokenStore>,
    pub sessions: Arc<SessionStore>,
    pub credentials: Arc<dyn CredentialVerifier>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: GuardConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Build state whose stores read time from `clock`.
    pub fn with_clock(config: GuardConfig, clock: Arc<dyn Clock>) -> Self {
        let login_guard = LoginAttemptGuard::new(LockoutPolicy::from(&config.lockout), clock.clone());
        let csrf = CsrfTokenStore::new(Duration::from_secs(config.csrf.token_ttl_secs), clock.clone());
        let sessions = SessionStore::new(Duration::from_secs(config.session.idle_ttl_secs), clock);
        let credentials = StaticCredentials::from_config(&config.users);

        Self {
            sanitizer: Arc::new(ArcSwap::from_pointee(InputSanitizer::new(&config.sanitize))),
            config: Arc::new(ArcSwap::from_pointee(config)),
            login_guard: Arc::new(login_guard),
            csrf: Arc::new(csrf),
            sessions: Arc::new(sessions),
            credentials: Arc::new(credentials),
            started_at: Instant::now(),
        }
    }

    /// Replace the credential verifier (e.g. with a database-backed one).
    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialVerifier>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Swap in a new configuration. HTTP-layer policy (origins, skip paths,
    /// cookie settings, sanitizer) takes effect on the next request; store
    /// TTLs, lockout policy and users keep their startup values.
    pub fn apply_config(&self, config: GuardConfig) {
        let current = self.config.load();
        if current.lockout != config.lockout
            || current.csrf.token_ttl_secs != config.csrf.token_ttl_secs
            || current.session.idle_ttl_secs != config.session.idle_ttl_secs
            || current.users != config.users
        {
            tracing::warn!("Lockout, TTL and user changes take effect after restart");
        }
        drop(current);

        self.sanitizer
            .store(Arc::new(InputSanitizer::new(&config.sanitize)));
        self.config.store(Arc::new(config));
        tracing::info!("Configuration updated");
    }
}

/// HTTP server for the guard service.
pub struct HttpServer {
    state: AppState,
    router: Router,
}

impl HttpServer {
    pub fn new(config: GuardConfig) -> Self {
        Self::with_state(AppState::new(config))
    }

    pub fn with_state(state: AppState) -> Self {
        let router = Self::build_router(state.clone());
        Self { state, router }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// The fully layered router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Layers listed last run first: request id → trace → timeout →
    /// metrics → sanitize → csrf → body limit → handler.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        let config = state.config.load_full();

        let mut app = Router::new()
            .route("/health", get(handlers::health))
            .route("/auth/login", post(handlers::login))
            .route("/auth/logout", post(handlers::logout))
            .route("/csrf/token", get(handlers::issue_csrf_token))
            .route("/api/echo", get(handlers::echo_query).post(handlers::echo_body));

        if config.admin.enabled {
            app = app.merge(admin::setup_admin_router(state.clone()));
        }

        // Bodies the sanitizer does not buffer are still bounded for handlers.
        app.layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(middleware::from_fn_with_state(state.clone(), csrf_middleware))
            .layer(middleware::from_fn_with_state(state.clone(), sanitize_middleware))
            .layer(middleware::from_fn(track_metrics))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %sanitize_log_line(request.uri().path()),
                    request_id = %sanitize_log_line(request_id(request.headers()).unwrap_or("-")),
                )
            }))
            .layer(set_request_id_layer())
    }

    /// Run the server until `shutdown` fires.
    ///
    /// Configuration updates received on `config_updates` are applied live.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GuardConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let config = self.state.config.load_full();
        let sweeper = StoreSweeper::new(
            self.state.login_guard.clone(),
            self.state.csrf.clone(),
            self.state.sessions.clone(),
            Duration::from_secs(config.csrf.cleanup_interval_secs),
        );
        tokio::spawn(sweeper.run(shutdown.resubscribe()));

        let state = self.state.clone();
        let mut updates_shutdown = shutdown.resubscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    update = config_updates.recv() => match update {
                        Some(new_config) => state.apply_config(new_config),
                        None => break,
                    },
                    _ = updates_shutdown.recv() => break,
                }
            }
        });

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
