//! In-process pipeline tests driven through `tower::ServiceExt::oneshot`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use panel_guard::auth::{StoreError, User, UserId, UserStore};
use panel_guard::clock::ManualClock;
use panel_guard::config::TlsConfig;
use panel_guard::http::{build_router, AppState, HttpServer, ServeError, X_REQUEST_ID};
use panel_guard::lifecycle::Shutdown;
use panel_guard::net::TlsError;
use panel_guard::security::RateLimiters;
use tower::ServiceExt;

mod common;

use common::{sampler, seeded_store, session_cookie, test_config};

fn app(requests: u32, login_attempts: u32) -> (Router, ManualClock) {
    let mut config = test_config();
    config.rate_limit.requests_per_window = requests;
    config.rate_limit.login_attempts = login_attempts;

    let clock = ManualClock::at_epoch_secs(1_000);
    let limiters = RateLimiters::with_clock(&config.rate_limit, Arc::new(clock.clone()));
    let sampler = sampler(&config);

    let mut state = AppState::new(config, seeded_store(), sampler);
    state.limiters = Arc::new(limiters);
    (build_router(state), clock)
}

fn get_from(ip: &str, path: &str, cookie: Option<String>) -> Request<Body> {
    let mut builder = Request::builder().uri(path);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let mut request = builder.body(Body::empty()).unwrap();
    let addr: SocketAddr = format!("{ip}:40000").parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(addr));
    request
}

fn login_from(ip: &str, password: &str) -> Request<Body> {
    let mut request = Request::builder()
        .method("POST")
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("username=admin&password={password}")))
        .unwrap();
    let addr: SocketAddr = format!("{ip}:40000").parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(addr));
    request
}

#[tokio::test]
async fn limiter_runs_before_authentication() {
    let (app, _) = app(1, 5);

    let first = app.clone().oneshot(get_from("10.0.0.1", "/api/me", None)).await.unwrap();
    assert_eq!(first.status(), StatusCode::UNAUTHORIZED);

    // a valid session does not help once the client is over its limit
    let second = app
        .oneshot(get_from("10.0.0.1", "/api/me", Some(session_cookie(1))))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn sixth_request_in_window_is_denied() {
    let (app, _) = app(5, 5);

    for _ in 0..5 {
        let res = app.clone().oneshot(get_from("10.0.0.1", "/live", None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
    let res = app.clone().oneshot(get_from("10.0.0.1", "/live", None)).await.unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(res.headers()[header::RETRY_AFTER], "60");

    // other clients are unaffected
    let other = app.oneshot(get_from("10.0.0.2", "/live", None)).await.unwrap();
    assert_eq!(other.status(), StatusCode::OK);
}

#[tokio::test]
async fn window_reset_restores_capacity() {
    let (app, clock) = app(2, 5);

    for _ in 0..2 {
        app.clone().oneshot(get_from("10.0.0.1", "/live", None)).await.unwrap();
    }
    let denied = app.clone().oneshot(get_from("10.0.0.1", "/live", None)).await.unwrap();
    assert_eq!(denied.status(), StatusCode::TOO_MANY_REQUESTS);

    clock.advance(Duration::from_secs(60));

    let allowed = app.oneshot(get_from("10.0.0.1", "/live", None)).await.unwrap();
    assert_eq!(allowed.status(), StatusCode::OK);
}

#[tokio::test]
async fn exhausted_login_limiter_leaves_general_capacity() {
    let (app, _) = app(10, 1);

    let first = app.clone().oneshot(login_from("10.0.0.1", "bad")).await.unwrap();
    assert_eq!(first.status(), StatusCode::UNAUTHORIZED);

    let second = app.clone().oneshot(login_from("10.0.0.1", "bad")).await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

    // two general requests used so far, eight remain
    for _ in 0..8 {
        let res = app.clone().oneshot(get_from("10.0.0.1", "/live", None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
    let res = app.oneshot(get_from("10.0.0.1", "/live", None)).await.unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn missing_connect_info_shares_one_bucket() {
    let (app, _) = app(1, 5);
    let request = || Request::builder().uri("/live").body(Body::empty()).unwrap();

    let first = app.clone().oneshot(request()).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let second = app.oneshot(request()).await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
}

/// Store whose username lookup outlives the request timeout.
struct SlowStore;

impl UserStore for SlowStore {
    fn resolve(&self, _id: UserId) -> Result<Option<User>, StoreError> {
        Ok(None)
    }

    fn find_by_username(&self, _username: &str) -> Result<Option<User>, StoreError> {
        std::thread::sleep(Duration::from_millis(1_500));
        Ok(None)
    }

    fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[tokio::test]
async fn timed_out_request_still_passes_access_log() {
    let mut config = test_config();
    config.timeouts.request_secs = 1;
    let sampler = sampler(&config);
    let app = build_router(AppState::new(config, Arc::new(SlowStore), sampler));

    let mut request = login_from("10.0.0.1", "whatever");
    request
        .headers_mut()
        .insert(X_REQUEST_ID, "slow-login".parse().unwrap());

    let res = app.oneshot(request).await.unwrap();
    assert_eq!(res.status(), StatusCode::REQUEST_TIMEOUT);
    assert_eq!(res.headers()[X_REQUEST_ID], "slow-login");
}

#[tokio::test]
async fn serve_rejects_unparseable_bind_address() {
    let mut config = test_config();
    config.listener.bind_address = "not-an-address".to_string();
    let server = HttpServer::new(config.clone(), seeded_store(), sampler(&config));
    let shutdown = Shutdown::new();

    let err = server.serve(shutdown.subscribe()).await.unwrap_err();
    assert!(matches!(err, ServeError::InvalidAddress(ref addr) if addr == "not-an-address"));
}

#[tokio::test]
async fn serve_reports_missing_certificate() {
    let mut config = test_config();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.listener.tls = Some(TlsConfig {
        cert_path: "/nonexistent/cert.pem".to_string(),
        key_path: "/nonexistent/key.pem".to_string(),
    });
    let server = HttpServer::new(config.clone(), seeded_store(), sampler(&config));
    let shutdown = Shutdown::new();

    let err = server.serve(shutdown.subscribe()).await.unwrap_err();
    assert!(matches!(err, ServeError::Tls(TlsError::CertificateMissing(_))));
}
