//! Fixed-window rate limiting.
//!
//! Each limiter counts requests per client key inside a window that starts at
//! the key's first request and resets wholesale once it has fully elapsed.
//! A client can land up to `2 * capacity` requests across a window boundary.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::clock::{Clock, SystemClock};
use crate::config::RateLimitConfig;
use crate::http::request::client_key;
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::observability::metrics;

/// Counting state for one client inside one limiter.
#[derive(Debug, Clone, Copy)]
struct ClientWindow {
    count: u32,
    window_start: Instant,
}

/// Outcome of a single admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// Admitted; `remaining` more requests fit in the current window.
    Allowed { remaining: u32 },
    /// Rejected until the current window ends.
    Denied { retry_after: Duration },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed { .. })
    }
}

/// Per-client fixed-window counter.
///
/// All mutation (admission and cleanup) happens under one mutex per limiter,
/// so two limiters never contend with each other.
pub struct FixedWindowLimiter {
    name: &'static str,
    capacity: u32,
    window: Duration,
    clients: Mutex<HashMap<String, ClientWindow>>,
    clock: Arc<dyn Clock>,
}

impl FixedWindowLimiter {
    pub fn new(name: &'static str, capacity: u32, window: Duration) -> Self {
        Self::with_clock(name, capacity, window, Arc::new(SystemClock))
    }

    pub fn with_clock(
        name: &'static str,
        capacity: u32,
        window: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            name,
            capacity,
            window,
            clients: Mutex::new(HashMap::new()),
            clock,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Admit or reject one request from `key`.
    pub fn allow(&self, key: &str) -> bool {
        self.check(key).is_allowed()
    }

    /// Admit or reject one request from `key`, reporting remaining budget or
    /// the time until the key's window ends.
    pub fn check(&self, key: &str) -> RateLimitDecision {
        let now = self.clock.instant();
        let mut clients = self.lock();

        let state = clients.entry(key.to_owned()).or_insert(ClientWindow {
            count: 0,
            window_start: now,
        });

        let age = now.saturating_duration_since(state.window_start);
        if age >= self.window {
            // stale window: replace, never increment
            *state = ClientWindow {
                count: 1,
                window_start: now,
            };
            return RateLimitDecision::Allowed {
                remaining: self.capacity.saturating_sub(1),
            };
        }

        if state.count < self.capacity {
            state.count += 1;
            return RateLimitDecision::Allowed {
                remaining: self.capacity - state.count,
            };
        }

        RateLimitDecision::Denied {
            retry_after: self.window - age,
        }
    }

    /// Drop every client whose window ended more than one window ago.
    /// Returns the number of entries removed.
    pub fn cleanup(&self) -> usize {
        let now = self.clock.instant();
        let mut clients = self.lock();
        let before = clients.len();
        clients.retain(|_, state| now.saturating_duration_since(state.window_start) <= self.window);
        let removed = before - clients.len();
        metrics::record_tracked_clients(self.name, clients.len());
        removed
    }

    /// Number of clients currently holding state.
    pub fn tracked_clients(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ClientWindow>> {
        self.clients.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Run [`FixedWindowLimiter::cleanup`] once per window until shutdown.
pub fn spawn_cleanup(
    limiter: Arc<FixedWindowLimiter>,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = limiter.window();
        let mut ticker = time::interval_at(time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::debug!(limiter = limiter.name(), period = ?period, "Limiter cleanup started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = limiter.cleanup();
                    if removed > 0 {
                        tracing::debug!(limiter = limiter.name(), removed, "Evicted stale client windows");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!(limiter = limiter.name(), "Limiter cleanup stopping");
                    break;
                }
            }
        }
    })
}

/// The two independently configured limiters of the panel.
pub struct RateLimiters {
    pub enabled: bool,
    /// Gates every request.
    pub general: Arc<FixedWindowLimiter>,
    /// Gates login submissions only.
    pub login: Arc<FixedWindowLimiter>,
}

impl RateLimiters {
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            enabled: config.enabled,
            general: Arc::new(FixedWindowLimiter::with_clock(
                "general",
                config.requests_per_window,
                config.window(),
                clock.clone(),
            )),
            login: Arc::new(FixedWindowLimiter::with_clock(
                "login",
                config.login_attempts,
                config.login_window(),
                clock,
            )),
        }
    }

    /// Start one cleanup task per limiter.
    pub fn spawn_cleanup(&self, shutdown: &crate::lifecycle::Shutdown) -> Vec<JoinHandle<()>> {
        if !self.enabled {
            return Vec::new();
        }
        vec![
            spawn_cleanup(self.general.clone(), shutdown.subscribe()),
            spawn_cleanup(self.login.clone(), shutdown.subscribe()),
        ]
    }
}

/// Pipeline stage gating all traffic by client address.
pub async fn general_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.limiters.enabled {
        return next.run(request).await;
    }

    let key = client_key(&request);
    match state.limiters.general.check(&key) {
        RateLimitDecision::Allowed { .. } => next.run(request).await,
        RateLimitDecision::Denied { retry_after } => {
            tracing::warn!(client = %key, limiter = "general", "Rate limit exceeded");
            metrics::record_rate_limited("general");
            ApiError::RateLimited {
                retry_after: retry_after_secs(retry_after),
            }
            .into_response()
        }
    }
}

/// Pipeline stage gating login submissions by client address.
pub async fn login_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.limiters.enabled {
        return next.run(request).await;
    }

    let key = client_key(&request);
    match state.limiters.login.check(&key) {
        RateLimitDecision::Allowed { .. } => next.run(request).await,
        RateLimitDecision::Denied { retry_after } => {
            tracing::warn!(client = %key, limiter = "login", "Too many login attempts");
            metrics::record_rate_limited("login");
            ApiError::LoginThrottled {
                retry_after: retry_after_secs(retry_after),
            }
            .into_response()
        }
    }
}

/// Whole seconds a client should wait, never less than one.
fn retry_after_secs(wait: Duration) -> u64 {
    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    secs.max(1)
}
