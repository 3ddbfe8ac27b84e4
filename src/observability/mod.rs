//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Pipeline stages, limiter cleanup, sampler:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Request id is generated by the Logger stage and echoed in `x-request-id`
//! - Metrics are recorded through the `metrics` facade; without an installed
//!   recorder every call is a no-op

pub mod logging;
pub mod metrics;
