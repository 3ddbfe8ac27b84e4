//! Host resource monitoring.
//!
//! # Data Flow
//! ```text
//! ticker (sampler.rs, every interval)
//!     → source.rs (blocking OS probes, off the async workers)
//!     → history.rs (append, evict oldest when full)
//!
//! API handlers
//!     → history.rs query(period)   ordered samples
//!     → sampler.rs snapshot()      current view
//! ```
//!
//! # Design Decisions
//! - One sampler per process, started explicitly at bootstrap
//! - Measurement never holds the history lock
//! - A failed probe zeroes its dimension, the loop keeps running

pub mod history;
pub mod sample;
pub mod sampler;
pub mod source;

pub use history::{HistoryPeriod, ResourceHistory};
pub use sample::{DiskUsage, MemoryUsage, MetricSample, NetworkTotals, SystemSnapshot};
pub use sampler::ResourceSampler;
pub use source::{MetricsSource, SourceError, SysinfoSource};
