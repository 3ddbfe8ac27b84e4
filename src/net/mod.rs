//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! listener.tls unset → plain TCP, axum::serve
//! listener.tls set   → tls.rs (load PEM pair) → axum-server rustls acceptor
//! ```

pub mod tls;

pub use tls::{load_tls_config, TlsError};
