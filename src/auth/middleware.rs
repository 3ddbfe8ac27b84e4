//! Session authentication stage of the request pipeline.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::auth::session::{removal_cookie, token_from_headers, SessionToken};
use crate::auth::store::{Role, StoreError, UserId, UserStore};
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::observability::metrics;

/// Identity attached to a single request after its session resolved.
///
/// Lives in that request's extensions only and is rebuilt from the store on
/// every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedIdentity {
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
}

/// Why a request could not be authenticated.
#[derive(Debug)]
pub enum AuthFailure {
    MissingToken,
    MalformedToken,
    /// The token named a user the store does not know.
    UnknownUser(UserId),
    StoreUnavailable(StoreError),
}

impl AuthFailure {
    /// Whether the client's session cookie should be cleared.
    pub fn clears_session(&self) -> bool {
        matches!(self, AuthFailure::UnknownUser(_))
    }

    pub fn reason(&self) -> &'static str {
        match self {
            AuthFailure::MissingToken => "missing_token",
            AuthFailure::MalformedToken => "malformed_token",
            AuthFailure::UnknownUser(_) => "unknown_user",
            AuthFailure::StoreUnavailable(_) => "store_unavailable",
        }
    }
}

/// Resolves session cookies to identities.
pub struct Authenticator {
    store: Arc<dyn UserStore>,
    cookie_name: String,
}

impl Authenticator {
    pub fn new(store: Arc<dyn UserStore>, cookie_name: impl Into<String>) -> Self {
        Self {
            store,
            cookie_name: cookie_name.into(),
        }
    }

    pub fn authenticate(&self, headers: &HeaderMap) -> Result<AuthenticatedIdentity, AuthFailure> {
        let raw = token_from_headers(headers, &self.cookie_name).ok_or(AuthFailure::MissingToken)?;
        let user_id = SessionToken::parse(raw).ok_or(AuthFailure::MalformedToken)?;

        let user = self
            .store
            .resolve(user_id)
            .map_err(AuthFailure::StoreUnavailable)?
            .ok_or(AuthFailure::UnknownUser(user_id))?;

        Ok(AuthenticatedIdentity {
            user_id: user.id,
            username: user.username,
            role: user.role,
        })
    }
}

/// Paths answered with structured JSON rather than page redirects.
pub fn is_api_path(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}

/// Pipeline stage guarding protected routes.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match state.authenticator.authenticate(request.headers()) {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(failure) => {
            let path = request.uri().path();
            metrics::record_auth_rejection(failure.reason());
            match &failure {
                AuthFailure::StoreUnavailable(e) => {
                    tracing::error!(path = %path, error = %e, "Session lookup failed");
                }
                AuthFailure::UnknownUser(id) => {
                    tracing::info!(path = %path, user_id = id, "Session for unknown user, clearing cookie");
                }
                _ => {
                    tracing::debug!(path = %path, reason = failure.reason(), "Unauthenticated request");
                }
            }
            reject(&state, path, &failure)
        }
    }
}

fn reject(state: &AppState, path: &str, failure: &AuthFailure) -> Response {
    let error = match failure {
        AuthFailure::StoreUnavailable(_) => ApiError::StoreUnavailable,
        _ if is_api_path(path) => ApiError::Unauthorized,
        _ => ApiError::LoginRequired,
    };

    let mut response = error.into_response();
    if failure.clears_session() {
        let cookie = removal_cookie(&state.config.session).to_string();
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    response
}

/// Extractor for the identity placed by [`require_session`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthenticatedIdentity);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedIdentity>()
            .cloned()
            .map(CurrentUser)
            .ok_or(ApiError::Unauthorized)
    }
}
