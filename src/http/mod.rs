//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (router, shared state)
//!     → request.rs access_log        Logger, always runs
//!     → security general_rate_limit  429 short-circuit
//!     → auth require_session         302 /login | 401 JSON | 503
//!       or security login_rate_limit POST /login only
//!     → handlers.rs
//!     → response.rs (ApiError → status + body)
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::ApiError;
pub use server::{build_router, AppState, HttpServer, ServeError};
