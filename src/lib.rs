//! Request governance core of a self-hosted control panel.
//!
//! Per-client fixed-window rate limiting, cookie session authentication and
//! a bounded host-metrics history, composed into one axum pipeline.

pub mod auth;
pub mod clock;
pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod monitoring;
pub mod net;
pub mod observability;
pub mod security;

pub use config::schema::PanelConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
