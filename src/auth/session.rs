//! Session token format and cookie handling.
//!
//! A session token is the literal text `user_<id>`. The format carries no
//! signature: any client can mint a token for any id. It is kept for
//! compatibility with existing panel sessions; see DESIGN.md.

use axum::http::{header, HeaderMap};
use cookie::{Cookie, SameSite};

use crate::auth::store::UserId;
use crate::config::SessionConfig;

pub const TOKEN_PREFIX: &str = "user_";

/// Opaque value stored in the session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn for_user(id: UserId) -> Self {
        Self(format!("{TOKEN_PREFIX}{id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extract the user id from a raw token.
    ///
    /// Accepts exactly `user_` followed by one or more ASCII digits that fit
    /// in a [`UserId`]. Anything else is `None`.
    pub fn parse(raw: &str) -> Option<UserId> {
        let digits = raw.strip_prefix(TOKEN_PREFIX)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }
}

/// Read the session token from the request's `Cookie` headers.
pub fn token_from_headers<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == cookie_name)
        .and_then(|cookie| cookie.value_raw())
        .filter(|value| !value.is_empty())
}

/// Cookie issued on successful login.
pub fn session_cookie(config: &SessionConfig, token: &SessionToken) -> Cookie<'static> {
    let max_age = i64::try_from(config.max_age_secs).unwrap_or(i64::MAX);
    Cookie::build((config.cookie_name.clone(), token.as_str().to_owned()))
        .path("/")
        .http_only(true)
        .secure(config.secure)
        .same_site(SameSite::Lax)
        .max_age(cookie::time::Duration::seconds(max_age))
        .build()
}

/// Cookie instructing the client to forget its session.
pub fn removal_cookie(config: &SessionConfig) -> Cookie<'static> {
    let mut cookie = Cookie::build((config.cookie_name.clone(), ""))
        .path("/")
        .http_only(true)
        .secure(config.secure)
        .same_site(SameSite::Lax)
        .build();
    cookie.make_removal();
    cookie
}
