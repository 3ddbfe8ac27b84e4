//! Rejections produced by the request pipeline and handlers.
//!
//! Every variant maps to one status code and one body shape. Interactive
//! rejections redirect, API rejections are JSON.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("rate limit exceeded, retry after {retry_after}s")]
    RateLimited { retry_after: u64 },

    #[error("too many login attempts, retry after {retry_after}s")]
    LoginThrottled { retry_after: u64 },

    #[error("unauthorized")]
    Unauthorized,

    /// Interactive request without a valid session.
    #[error("login required")]
    LoginRequired,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("user store unavailable")]
    StoreUnavailable,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::RateLimited { .. } | ApiError::LoginThrottled { .. } => {
                StatusCode::TOO_MANY_REQUESTS
            }
            ApiError::Unauthorized | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::LoginRequired => StatusCode::FOUND,
            ApiError::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::RateLimited { retry_after } => throttled(
                retry_after,
                "Too many requests. Please try again later.",
            ),
            ApiError::LoginThrottled { retry_after } => throttled(
                retry_after,
                "Too many login attempts. Please try again later.",
            ),
            ApiError::Unauthorized => {
                (status, Json(json!({ "error": "unauthorized" }))).into_response()
            }
            ApiError::LoginRequired => (status, [(header::LOCATION, "/login")]).into_response(),
            ApiError::InvalidCredentials => (
                status,
                Json(json!({
                    "error": "invalid_credentials",
                    "message": "Invalid username or password",
                })),
            )
                .into_response(),
            ApiError::StoreUnavailable => (
                status,
                Json(json!({
                    "error": "service_unavailable",
                    "message": "User store is unavailable",
                })),
            )
                .into_response(),
            ApiError::BadRequest(message) => (
                status,
                Json(json!({ "error": "bad_request", "message": message })),
            )
                .into_response(),
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal error");
                (status, Json(json!({ "error": "internal_error" }))).into_response()
            }
        }
    }
}

fn throttled(retry_after: u64, message: &str) -> Response {
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(json!({
            "error": "rate_limit_exceeded",
            "message": message,
            "retry_after": retry_after,
        })),
    )
        .into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
    response
}
