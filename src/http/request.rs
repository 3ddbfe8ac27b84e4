//! Request identification and the Logger stage.
//!
//! # Responsibilities
//! - Derive the client key used by the rate limiters
//! - Assign a request id (UUID v4) unless the caller sent a usable one
//! - Log and time every request, including short-circuited ones

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, Request},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::observability::metrics;

pub const X_REQUEST_ID: &str = "x-request-id";

const MAX_REQUEST_ID_LEN: usize = 64;

/// Peer IP address, or `"unknown"` when the connection info is missing.
pub fn client_key<B>(request: &axum::http::Request<B>) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn request_id<B>(request: &axum::http::Request<B>) -> String {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|id| !id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Outermost pipeline stage. Wraps timing around everything after it.
pub async fn access_log(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let request_id = request_id(&request);
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let client = client_key(&request);

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }

    let status = response.status().as_u16();
    tracing::info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        client = %client,
        status,
        latency_ms = start.elapsed().as_millis() as u64,
        "Request handled"
    );
    metrics::record_request(method.as_str(), status, start);

    response
}
