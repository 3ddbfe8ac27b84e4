//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the shared application state once at bootstrap
//! - Compose the request pipeline in its fixed order
//! - Start the background tasks that feed the shared state
//! - Serve plain HTTP or HTTPS with graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    handler::Handler,
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::auth::middleware::require_session;
use crate::auth::{Authenticator, UserStore};
use crate::config::PanelConfig;
use crate::health;
use crate::http::handlers;
use crate::http::request::access_log;
use crate::lifecycle::Shutdown;
use crate::monitoring::ResourceSampler;
use crate::net::{load_tls_config, TlsError};
use crate::security::rate_limit::{general_rate_limit, login_rate_limit, RateLimiters};

/// Failure to bring up or keep serving the listener.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("invalid bind address {0}")]
    InvalidAddress(String),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Tls(#[from] TlsError),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared state handed to every pipeline stage and handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<PanelConfig>,
    pub limiters: Arc<RateLimiters>,
    pub authenticator: Arc<Authenticator>,
    pub store: Arc<dyn UserStore>,
    pub sampler: Arc<ResourceSampler>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        config: PanelConfig,
        store: Arc<dyn UserStore>,
        sampler: Arc<ResourceSampler>,
    ) -> Self {
        let limiters = Arc::new(RateLimiters::from_config(&config.rate_limit));
        let authenticator = Arc::new(Authenticator::new(
            Arc::clone(&store),
            config.session.cookie_name.clone(),
        ));

        Self {
            config: Arc::new(config),
            limiters,
            authenticator,
            store,
            sampler,
            started_at: Instant::now(),
        }
    }
}

/// HTTP server for the panel.
pub struct HttpServer {
    state: AppState,
    router: Router,
}

impl HttpServer {
    pub fn new(
        config: PanelConfig,
        store: Arc<dyn UserStore>,
        sampler: Arc<ResourceSampler>,
    ) -> Self {
        Self::from_state(AppState::new(config, store, sampler))
    }

    pub fn from_state(state: AppState) -> Self {
        let router = build_router(state.clone());
        Self { state, router }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Start limiter cleanup and, when enabled, the resource sampler.
    pub fn start_background(&self, shutdown: &Shutdown) -> Vec<JoinHandle<()>> {
        let mut tasks = self.state.limiters.spawn_cleanup(shutdown);

        if self.state.config.monitoring.enabled {
            tasks.extend(self.state.sampler.start(shutdown.subscribe()));
        } else {
            tracing::info!("Resource monitoring disabled");
        }
        tasks
    }

    /// Bind `listener.bind_address` and serve HTTP or HTTPS, as configured,
    /// until the shutdown signal fires.
    pub async fn serve(self, shutdown: broadcast::Receiver<()>) -> Result<(), ServeError> {
        let address = self.state.config.listener.bind_address.clone();
        let addr: SocketAddr = address
            .parse()
            .map_err(|_| ServeError::InvalidAddress(address.clone()))?;

        match self.state.config.listener.tls.clone() {
            Some(tls) => {
                let rustls = load_tls_config(&tls).await?;
                self.run_tls(addr, rustls, shutdown).await
            }
            None => {
                let listener = TcpListener::bind(addr)
                    .await
                    .map_err(|source| ServeError::Bind { address, source })?;
                self.run(listener, shutdown).await
            }
        }
    }

    /// Serve plain HTTP until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServeError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Serve HTTPS until the shutdown signal fires.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServeError> {
        tracing::info!(address = %addr, "HTTPS server starting");

        let handle = axum_server::Handle::new();
        let grace = Duration::from_secs(self.state.config.timeouts.shutdown_secs);
        let signal_handle = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            signal_handle.graceful_shutdown(Some(grace));
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(app)
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}

/// Compose routes and pipeline stages.
///
/// Stage order, outermost first: access log, request timeout, general
/// limiter, then either the session check (protected routes) or the login
/// limiter (login submission only), then the handler. The access log sits
/// outside the timeout so timed-out requests are still logged.
#[allow(deprecated)]
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/", get(handlers::dashboard))
        .route("/dashboard", get(handlers::dashboard))
        .route("/monitoring", get(handlers::monitoring_page))
        .route("/api/me", get(handlers::api_me))
        .route("/api/system", get(handlers::api_system))
        .route("/api/health", get(health::health))
        .route("/api/resources/history", get(handlers::api_resource_history))
        .route("/api/resources/realtime", get(handlers::api_resource_realtime))
        .route_layer(from_fn_with_state(state.clone(), require_session));

    let login_submit = handlers::login_submit
        .layer(from_fn_with_state(state.clone(), login_rate_limit));

    let public = Router::new()
        .route("/health", get(health::health))
        .route("/healthz", get(health::health))
        .route("/ready", get(health::ready))
        .route("/live", get(health::live))
        .route("/login", get(handlers::login_page).post(login_submit))
        .route("/logout", get(handlers::logout));

    let request_timeout = Duration::from_secs(state.config.timeouts.request_secs);

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(from_fn_with_state(state.clone(), general_rate_limit))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(from_fn(access_log))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
