//! End-to-end tests of the request pipeline against a live server.

use reqwest::header::{COOKIE, LOCATION, RETRY_AFTER, SET_COOKIE};
use reqwest::StatusCode;
use serde_json::Value;

mod common;

use common::{client, session_cookie, spawn_server, test_config, ADMIN_PASSWORD};

fn set_cookies(res: &reqwest::Response) -> Vec<String> {
    res.headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_owned)
        .collect()
}

#[tokio::test]
async fn login_issues_session_and_unlocks_api() {
    let server = spawn_server(test_config()).await;
    let client = client();

    let res = client
        .post(server.url("/login"))
        .form(&[("username", "admin"), ("password", ADMIN_PASSWORD)])
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(res.headers()[LOCATION], "/dashboard");
    let cookies = set_cookies(&res);
    assert!(cookies.iter().any(|c| c.starts_with("session=user_1") && c.contains("HttpOnly")));

    let me: Value = client
        .get(server.url("/api/me"))
        .header(COOKIE, session_cookie(1))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["user_id"], 1);
    assert_eq!(me["username"], "admin");
    assert_eq!(me["role"], "admin");
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let server = spawn_server(test_config()).await;

    let res = client()
        .post(server.url("/login"))
        .form(&[("username", "admin"), ("password", "nope")])
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookies(&res).is_empty());
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_credentials");
}

#[tokio::test]
async fn rejection_depends_on_path() {
    let server = spawn_server(test_config()).await;
    let client = client();

    let api = client.get(server.url("/api/system")).send().await.unwrap();
    assert_eq!(api.status(), StatusCode::UNAUTHORIZED);
    let body: Value = api.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");

    let page = client.get(server.url("/dashboard")).send().await.unwrap();
    assert_eq!(page.status(), StatusCode::FOUND);
    assert_eq!(page.headers()[LOCATION], "/login");
}

#[tokio::test]
async fn malformed_cookie_is_unauthenticated() {
    let server = spawn_server(test_config()).await;

    let res = client()
        .get(server.url("/api/me"))
        .header(COOKIE, "session=abc")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookies(&res).is_empty());
}

#[tokio::test]
async fn stale_session_is_cleared() {
    let server = spawn_server(test_config()).await;

    let res = client()
        .get(server.url("/dashboard"))
        .header(COOKIE, session_cookie(42))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(res.headers()[LOCATION], "/login");
    let cookies = set_cookies(&res);
    assert!(cookies.iter().any(|c| c.starts_with("session=;") && c.contains("Max-Age=0")));
}

#[tokio::test]
async fn deleted_user_loses_access() {
    let server = spawn_server(test_config()).await;
    let client = client();

    let before = client
        .get(server.url("/api/me"))
        .header(COOKIE, session_cookie(1))
        .send()
        .await
        .unwrap();
    assert_eq!(before.status(), StatusCode::OK);

    server.store.remove(1);

    let after = client
        .get(server.url("/api/me"))
        .header(COOKIE, session_cookie(1))
        .send()
        .await
        .unwrap();
    assert_eq!(after.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn store_outage_is_503_not_bad_credentials() {
    let server = spawn_server(test_config()).await;
    server.store.set_available(false);
    let client = client();

    let api = client
        .get(server.url("/api/me"))
        .header(COOKIE, session_cookie(1))
        .send()
        .await
        .unwrap();
    assert_eq!(api.status(), StatusCode::SERVICE_UNAVAILABLE);

    let login = client
        .post(server.url("/login"))
        .form(&[("username", "admin"), ("password", ADMIN_PASSWORD)])
        .send()
        .await
        .unwrap();
    assert_eq!(login.status(), StatusCode::SERVICE_UNAVAILABLE);

    let ready = client.get(server.url("/ready")).send().await.unwrap();
    assert_eq!(ready.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn general_limit_returns_retry_guidance() {
    let mut config = test_config();
    config.rate_limit.requests_per_window = 5;
    let server = spawn_server(config).await;
    let client = client();

    for _ in 0..5 {
        let res = client.get(server.url("/live")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    let res = client.get(server.url("/live")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);

    let retry_after: u64 = res.headers()[RETRY_AFTER].to_str().unwrap().parse().unwrap();
    assert!((1..=60).contains(&retry_after));

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "rate_limit_exceeded");
    assert_eq!(body["retry_after"], retry_after);
}

#[tokio::test]
async fn login_limiter_leaves_general_traffic_alone() {
    let mut config = test_config();
    config.rate_limit.requests_per_window = 100;
    config.rate_limit.login_attempts = 2;
    let server = spawn_server(config).await;
    let client = client();

    for _ in 0..2 {
        let res = client
            .post(server.url("/login"))
            .form(&[("username", "admin"), ("password", "guess")])
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    // even the right password is refused until the window resets
    let throttled = client
        .post(server.url("/login"))
        .form(&[("username", "admin"), ("password", ADMIN_PASSWORD)])
        .send()
        .await
        .unwrap();
    assert_eq!(throttled.status(), StatusCode::TOO_MANY_REQUESTS);

    let live = client.get(server.url("/live")).send().await.unwrap();
    assert_eq!(live.status(), StatusCode::OK);

    let page = client.get(server.url("/login")).send().await.unwrap();
    assert_eq!(page.status(), StatusCode::OK);
}

#[tokio::test]
async fn disabled_limits_pass_everything() {
    let mut config = test_config();
    config.rate_limit.enabled = false;
    config.rate_limit.requests_per_window = 1;
    let server = spawn_server(config).await;
    let client = client();

    for _ in 0..5 {
        let res = client.get(server.url("/live")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn history_endpoint_filters_by_period() {
    let server = spawn_server(test_config()).await;
    server.sampler.sample_once().await;
    server.sampler.sample_once().await;
    let client = client();

    let body: Value = client
        .get(server.url("/api/resources/history?period=5m"))
        .header(COOKIE, session_cookie(1))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["period"], "5m");
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["mem_percent"], 25.0);
    assert_eq!(body["current"]["cpu_cores"], 2);

    let fallback: Value = client
        .get(server.url("/api/resources/history?period=1y"))
        .header(COOKIE, session_cookie(1))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fallback["period"], "1h");
}

#[tokio::test]
async fn realtime_snapshot() {
    let server = spawn_server(test_config()).await;

    let body: Value = client()
        .get(server.url("/api/resources/realtime"))
        .header(COOKIE, session_cookie(1))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["cpu_percent"], 12.0);
    assert_eq!(body["disk_percent"], 50.0);
    assert_eq!(body["uptime_secs"], 3600);
}

#[tokio::test]
async fn logout_clears_session() {
    let server = spawn_server(test_config()).await;

    let res = client()
        .get(server.url("/logout"))
        .header(COOKIE, session_cookie(1))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(res.headers()[LOCATION], "/login");
    assert!(set_cookies(&res).iter().any(|c| c.contains("Max-Age=0")));
}

#[tokio::test]
async fn health_probes() {
    let server = spawn_server(test_config()).await;
    let client = client();

    let health = client.get(server.url("/health")).send().await.unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    let body: Value = health.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["database"], "ok");
    assert_eq!(body["checks"]["disk"]["ok"], true);

    let live: Value = client
        .get(server.url("/live"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(live["status"], "alive");

    server.store.set_available(false);
    let degraded = client.get(server.url("/healthz")).send().await.unwrap();
    assert_eq!(degraded.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn every_response_carries_request_id() {
    let server = spawn_server(test_config()).await;

    let res = client().get(server.url("/api/me")).send().await.unwrap();
    assert!(res.headers().contains_key("x-request-id"));
}
