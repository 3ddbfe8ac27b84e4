//! OS metrics provider.

use std::path::PathBuf;
use std::time::Instant;

use sysinfo::{Disks, Networks, System, MINIMUM_CPU_UPDATE_INTERVAL};
use thiserror::Error;

use crate::monitoring::sample::{DiskUsage, MemoryUsage, NetworkTotals};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{0} metrics are not reported by this host")]
    Unsupported(&'static str),
    #[error("no disk mounted at {}", .0.display())]
    MountNotFound(PathBuf),
    #[error("collection aborted: {0}")]
    Collection(String),
}

/// Synchronous, possibly slow, possibly failing view of host utilization.
///
/// Each dimension fails on its own so one broken probe does not blank out the
/// rest of a sample.
pub trait MetricsSource: Send {
    fn cpu_percent(&mut self) -> Result<f64, SourceError>;

    fn memory(&mut self) -> Result<MemoryUsage, SourceError>;

    fn disk(&mut self) -> Result<DiskUsage, SourceError>;

    fn network_totals(&mut self) -> Result<NetworkTotals, SourceError>;

    fn cpu_cores(&self) -> usize;

    fn uptime_secs(&self) -> u64;
}

/// [`MetricsSource`] backed by `sysinfo`.
pub struct SysinfoSource {
    system: System,
    disks: Disks,
    networks: Networks,
    disk_mount: PathBuf,
    last_cpu_refresh: Instant,
}

impl SysinfoSource {
    pub fn new(disk_mount: impl Into<PathBuf>) -> Self {
        let mut system = System::new();
        // cpu usage is a delta between two refreshes
        system.refresh_cpu();

        Self {
            system,
            disks: Disks::new_with_refreshed_list(),
            networks: Networks::new_with_refreshed_list(),
            disk_mount: disk_mount.into(),
            last_cpu_refresh: Instant::now(),
        }
    }
}

impl MetricsSource for SysinfoSource {
    fn cpu_percent(&mut self) -> Result<f64, SourceError> {
        let since = self.last_cpu_refresh.elapsed();
        if since < MINIMUM_CPU_UPDATE_INTERVAL {
            std::thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL - since);
        }
        self.system.refresh_cpu();
        self.last_cpu_refresh = Instant::now();

        if self.system.cpus().is_empty() {
            return Err(SourceError::Unsupported("cpu"));
        }
        Ok(f64::from(self.system.global_cpu_info().cpu_usage()))
    }

    fn memory(&mut self) -> Result<MemoryUsage, SourceError> {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        if total == 0 {
            return Err(SourceError::Unsupported("memory"));
        }
        Ok(MemoryUsage {
            total,
            used: self.system.used_memory(),
            free: self.system.free_memory(),
        })
    }

    fn disk(&mut self) -> Result<DiskUsage, SourceError> {
        self.disks.refresh();
        let disk = self
            .disks
            .iter()
            .find(|disk| disk.mount_point() == self.disk_mount)
            .ok_or_else(|| SourceError::MountNotFound(self.disk_mount.clone()))?;

        let total = disk.total_space();
        let free = disk.available_space();
        Ok(DiskUsage {
            total,
            used: total.saturating_sub(free),
            free,
        })
    }

    fn network_totals(&mut self) -> Result<NetworkTotals, SourceError> {
        self.networks.refresh();
        let totals = self
            .networks
            .iter()
            .fold(NetworkTotals::default(), |acc, (_, data)| NetworkTotals {
                received: acc.received.saturating_add(data.total_received()),
                transmitted: acc.transmitted.saturating_add(data.total_transmitted()),
            });
        Ok(totals)
    }

    fn cpu_cores(&self) -> usize {
        self.system.cpus().len()
    }

    fn uptime_secs(&self) -> u64 {
        System::uptime()
    }
}
