//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the panel.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::auth::Role;

/// Root configuration for the control panel.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PanelConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Per-client request governance.
    pub rate_limit: RateLimitConfig,

    /// Session cookie settings.
    pub session: SessionConfig,

    /// Background resource sampling.
    pub monitoring: MonitoringConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Accounts seeded into the user store at startup.
    pub users: Vec<UserAccount>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind_address: String,

    /// Optional TLS configuration. When present the panel serves HTTPS only.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            tls: None,
        }
    }
}

impl ListenerConfig {
    /// Replace the host part of `bind_address`, keeping the port.
    pub fn set_host(&mut self, host: &str) {
        let port = self
            .bind_address
            .rsplit_once(':')
            .map(|(_, port)| port.to_string())
            .unwrap_or_else(|| "8080".to_string());
        self.bind_address = format!("{}:{}", host, port);
    }

    /// Replace the port part of `bind_address`, keeping the host.
    pub fn set_port(&mut self, port: u16) {
        let host = self
            .bind_address
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| self.bind_address.clone());
        self.bind_address = format!("{}:{}", host, port);
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Rate limiting configuration.
///
/// The general and login limiters count and reset independently.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Requests allowed per client per window on every route.
    pub requests_per_window: u32,

    /// Login submissions allowed per client per window.
    pub login_attempts: u32,

    /// General window length in seconds.
    pub window_secs: u64,

    /// Login window length in seconds.
    pub login_window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_window: 60,
            login_attempts: 5,
            window_secs: 60,
            login_window_secs: 60,
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn login_window(&self) -> Duration {
        Duration::from_secs(self.login_window_secs)
    }
}

/// Session cookie configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Name of the cookie carrying the session token.
    pub cookie_name: String,

    /// Cookie lifetime in seconds.
    pub max_age_secs: u64,

    /// Mark the cookie `Secure` (HTTPS only).
    pub secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "session".to_string(),
            max_age_secs: 7 * 24 * 60 * 60,
            secure: false,
        }
    }
}

/// Resource monitoring configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Run the background sampler.
    pub enabled: bool,

    /// Seconds between samples.
    pub interval_secs: u64,

    /// Number of samples kept in memory.
    pub retention: usize,

    /// Mount point whose utilization is reported as disk usage.
    pub disk_mount: String,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 10,
            // one hour at the default interval
            retention: 360,
            disk_mount: "/".to_string(),
        }
    }
}

impl MonitoringConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Grace period for in-flight requests at shutdown, in seconds.
    pub shutdown_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            shutdown_secs: 5,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// A panel account loaded from configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserAccount {
    pub id: i64,
    pub username: String,

    /// Argon2 PHC string, as printed by `panel-guard hash-password`.
    pub password_hash: String,

    #[serde(default)]
    pub role: Role,

    #[serde(default)]
    pub email: String,
}
