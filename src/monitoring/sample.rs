//! Resource sample types.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One point of the utilization time series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSample {
    pub timestamp: DateTime<Utc>,
    pub cpu_percent: f64,
    pub mem_percent: f64,
    pub disk_percent: f64,
    /// Bytes received on all interfaces since boot.
    pub net_in: u64,
    /// Bytes sent on all interfaces since boot.
    pub net_out: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MemoryUsage {
    pub total: u64,
    pub used: u64,
    pub free: u64,
}

impl MemoryUsage {
    pub fn percent(&self) -> f64 {
        percent(self.used, self.total)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DiskUsage {
    pub total: u64,
    pub used: u64,
    pub free: u64,
}

impl DiskUsage {
    pub fn percent(&self) -> f64 {
        percent(self.used, self.total)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NetworkTotals {
    pub received: u64,
    pub transmitted: u64,
}

/// Instantaneous system view served next to the history.
#[derive(Debug, Clone, Serialize)]
pub struct SystemSnapshot {
    pub timestamp: DateTime<Utc>,
    pub os: &'static str,
    pub arch: &'static str,
    pub cpu_cores: usize,
    pub cpu_percent: f64,
    pub mem_total: u64,
    pub mem_used: u64,
    pub mem_free: u64,
    pub mem_percent: f64,
    pub disk_total: u64,
    pub disk_used: u64,
    pub disk_free: u64,
    pub disk_percent: f64,
    pub uptime_secs: u64,
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
