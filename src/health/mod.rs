//! Health, readiness and liveness probes.
//!
//! # Status
//! ```text
//! critical  memory or disk above 95% used        → 503
//! degraded  user store unreachable                → 503
//! healthy   otherwise                             → 200
//! ```
//!
//! Resource figures come from the latest sample when the sampler has one, so
//! a probe does not pay for a fresh OS measurement.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use crate::http::server::AppState;

const CRITICAL_PERCENT: f64 = 95.0;
const OK_PERCENT: f64 = 90.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Critical,
}

#[derive(Debug, Clone, Serialize)]
pub struct UsageCheck {
    pub used_percent: f64,
    pub ok: bool,
}

impl UsageCheck {
    fn new(used_percent: f64) -> Self {
        Self {
            used_percent,
            ok: used_percent < OK_PERCENT,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthChecks {
    /// "ok" or "error".
    pub database: &'static str,
    pub memory: UsageCheck,
    pub disk: UsageCheck,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub version: &'static str,
    pub checks: HealthChecks,
    pub uptime_secs: u64,
}

impl IntoResponse for HealthReport {
    fn into_response(self) -> Response {
        let code = match self.status {
            HealthStatus::Healthy => StatusCode::OK,
            HealthStatus::Degraded | HealthStatus::Critical => StatusCode::SERVICE_UNAVAILABLE,
        };
        (code, Json(self)).into_response()
    }
}

/// Pure status decision from the gathered inputs.
pub fn evaluate(store_ok: bool, mem_percent: f64, disk_percent: f64) -> HealthStatus {
    if mem_percent > CRITICAL_PERCENT || disk_percent > CRITICAL_PERCENT {
        HealthStatus::Critical
    } else if !store_ok {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}

pub async fn health(State(state): State<AppState>) -> HealthReport {
    let store_ok = match state.store.ping() {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Health check: user store unreachable");
            false
        }
    };

    let (mem_percent, disk_percent) = match state.sampler.history().latest() {
        Some(sample) => (sample.mem_percent, sample.disk_percent),
        None => {
            let snapshot = state.sampler.snapshot().await;
            (snapshot.mem_percent, snapshot.disk_percent)
        }
    };

    HealthReport {
        status: evaluate(store_ok, mem_percent, disk_percent),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION"),
        checks: HealthChecks {
            database: if store_ok { "ok" } else { "error" },
            memory: UsageCheck::new(mem_percent),
            disk: UsageCheck::new(disk_percent),
        },
        uptime_secs: state.started_at.elapsed().as_secs(),
    }
}

/// Ready when the user store answers.
pub async fn ready(State(state): State<AppState>) -> Response {
    match state.store.ping() {
        Ok(()) => Json(json!({ "status": "ready" })).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "not_ready", "error": "user store not available" })),
            )
                .into_response()
        }
    }
}

pub async fn live() -> Json<serde_json::Value> {
    Json(json!({ "status": "alive" }))
}
