//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use panel_guard::auth::password::{hash_password_with, HashCost};
use panel_guard::auth::{InMemoryUserStore, Role, User};
use panel_guard::config::PanelConfig;
use panel_guard::lifecycle::Shutdown;
use panel_guard::monitoring::{
    DiskUsage, MemoryUsage, MetricsSource, NetworkTotals, ResourceSampler, SourceError,
};
use panel_guard::HttpServer;
use tokio::net::TcpListener;

pub const ADMIN_PASSWORD: &str = "correct horse";

/// Host metrics that never change.
pub struct StaticSource;

impl MetricsSource for StaticSource {
    fn cpu_percent(&mut self) -> Result<f64, SourceError> {
        Ok(12.0)
    }

    fn memory(&mut self) -> Result<MemoryUsage, SourceError> {
        Ok(MemoryUsage {
            total: 8_000,
            used: 2_000,
            free: 6_000,
        })
    }

    fn disk(&mut self) -> Result<DiskUsage, SourceError> {
        Ok(DiskUsage {
            total: 100_000,
            used: 50_000,
            free: 50_000,
        })
    }

    fn network_totals(&mut self) -> Result<NetworkTotals, SourceError> {
        Ok(NetworkTotals {
            received: 1_024,
            transmitted: 2_048,
        })
    }

    fn cpu_cores(&self) -> usize {
        2
    }

    fn uptime_secs(&self) -> u64 {
        3_600
    }
}

/// Defaults with the background sampler off; tests sample explicitly.
pub fn test_config() -> PanelConfig {
    let mut config = PanelConfig::default();
    config.monitoring.enabled = false;
    config
}

/// Store holding `admin` (id 1) with [`ADMIN_PASSWORD`].
pub fn seeded_store() -> Arc<InMemoryUserStore> {
    let cost = HashCost {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    };
    let store = InMemoryUserStore::new();
    store.insert(User {
        id: 1,
        username: "admin".to_string(),
        email: "admin@example.com".to_string(),
        role: Role::Admin,
        password_hash: hash_password_with(ADMIN_PASSWORD, cost).unwrap(),
    });
    Arc::new(store)
}

pub fn sampler(config: &PanelConfig) -> Arc<ResourceSampler> {
    Arc::new(ResourceSampler::new(Box::new(StaticSource), &config.monitoring))
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub store: Arc<InMemoryUserStore>,
    pub sampler: Arc<ResourceSampler>,
    pub shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Serve `config` on an ephemeral loopback port.
pub async fn spawn_server(config: PanelConfig) -> TestServer {
    let store = seeded_store();
    let sampler = sampler(&config);
    let server = HttpServer::new(config, store.clone(), sampler.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let stop = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, stop).await;
    });

    TestServer {
        addr,
        store,
        sampler,
        shutdown,
    }
}

/// Client that surfaces redirects instead of following them.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}

pub fn session_cookie(user_id: i64) -> String {
    format!("session=user_{user_id}")
}
