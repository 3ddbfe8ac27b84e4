//! Route handlers behind the pipeline stages.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::session::{removal_cookie, session_cookie};
use crate::auth::{verify_credentials, CurrentUser, SessionToken};
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::monitoring::{HistoryPeriod, SystemSnapshot};

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

pub async fn login_page() -> &'static str {
    "Sign in by posting `username` and `password` to /login"
}

/// Check credentials and issue the session cookie.
pub async fn login_submit(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    let LoginForm { username, password } = form;
    let store = Arc::clone(&state.store);
    let attempted = username.clone();

    // argon2 verification blocks for tens of milliseconds
    let outcome = tokio::task::spawn_blocking(move || {
        verify_credentials(store.as_ref(), &username, &password)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    let user = match outcome {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::warn!(username = %attempted, "Login failed");
            return Err(ApiError::InvalidCredentials);
        }
        Err(e) => {
            tracing::error!(error = %e, "Login aborted, user store unavailable");
            return Err(ApiError::StoreUnavailable);
        }
    };

    tracing::info!(user_id = user.id, username = %user.username, "User logged in");

    let cookie = session_cookie(&state.config.session, &SessionToken::for_user(user.id));
    Ok((
        StatusCode::FOUND,
        [
            (header::LOCATION, "/dashboard".to_string()),
            (header::SET_COOKIE, cookie.to_string()),
        ],
    )
        .into_response())
}

pub async fn logout(State(state): State<AppState>) -> Response {
    let cookie = removal_cookie(&state.config.session);
    (
        StatusCode::FOUND,
        [
            (header::LOCATION, "/login".to_string()),
            (header::SET_COOKIE, cookie.to_string()),
        ],
    )
        .into_response()
}

pub async fn dashboard(CurrentUser(user): CurrentUser) -> String {
    format!("Dashboard\nSigned in as {} ({:?})", user.username, user.role)
}

pub async fn monitoring_page(CurrentUser(user): CurrentUser) -> String {
    format!(
        "Monitoring\nSigned in as {}\nData: /api/resources/history?period=1h",
        user.username
    )
}

pub async fn api_me(CurrentUser(user): CurrentUser) -> impl IntoResponse {
    Json(user)
}

#[derive(Debug, Serialize)]
pub struct SystemInfo {
    pub version: &'static str,
    pub os: &'static str,
    pub arch: &'static str,
    pub cpu_cores: usize,
    pub uptime_secs: u64,
    pub sample_interval_secs: u64,
    pub samples_retained: usize,
    pub sample_capacity: usize,
}

pub async fn api_system(State(state): State<AppState>) -> Json<SystemInfo> {
    let snapshot = state.sampler.snapshot().await;
    let history = state.sampler.history();

    Json(SystemInfo {
        version: env!("CARGO_PKG_VERSION"),
        os: snapshot.os,
        arch: snapshot.arch,
        cpu_cores: snapshot.cpu_cores,
        uptime_secs: snapshot.uptime_secs,
        sample_interval_secs: state.sampler.interval().as_secs(),
        samples_retained: history.len(),
        sample_capacity: history.capacity(),
    })
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub period: Option<String>,
}

pub async fn api_resource_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Json<serde_json::Value> {
    let period = query
        .period
        .as_deref()
        .map(HistoryPeriod::parse_or_default)
        .unwrap_or_default();

    let data = state.sampler.query(period);
    let current = state.sampler.snapshot().await;

    Json(json!({
        "period": period.as_str(),
        "data": data,
        "current": current,
    }))
}

pub async fn api_resource_realtime(State(state): State<AppState>) -> Json<SystemSnapshot> {
    Json(state.sampler.snapshot().await)
}
