//! Periodic resource sampling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::clock::{Clock, SystemClock};
use crate::config::MonitoringConfig;
use crate::monitoring::history::{HistoryPeriod, ResourceHistory};
use crate::monitoring::sample::{
    DiskUsage, MemoryUsage, MetricSample, NetworkTotals, SystemSnapshot,
};
use crate::monitoring::source::{MetricsSource, SourceError};
use crate::observability::metrics;

/// One pass over every dimension of a [`MetricsSource`].
struct Reading {
    cpu: Result<f64, SourceError>,
    memory: Result<MemoryUsage, SourceError>,
    disk: Result<DiskUsage, SourceError>,
    network: Result<NetworkTotals, SourceError>,
    cpu_cores: usize,
    uptime_secs: u64,
}

impl Reading {
    /// Reading CPU resets the source's baseline, so it is optional.
    fn take(source: &mut dyn MetricsSource, with_cpu: bool) -> Self {
        Self {
            cpu: if with_cpu { source.cpu_percent() } else { Ok(0.0) },
            memory: source.memory(),
            disk: source.disk(),
            network: source.network_totals(),
            cpu_cores: source.cpu_cores(),
            uptime_secs: source.uptime_secs(),
        }
    }

    fn failed(reason: &str) -> Self {
        let err = || SourceError::Collection(reason.to_string());
        Self {
            cpu: Err(err()),
            memory: Err(err()),
            disk: Err(err()),
            network: Err(err()),
            cpu_cores: 0,
            uptime_secs: 0,
        }
    }
}

/// Background sampler feeding a [`ResourceHistory`].
pub struct ResourceSampler {
    history: Arc<ResourceHistory>,
    source: Arc<Mutex<Box<dyn MetricsSource>>>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    started: AtomicBool,
}

impl ResourceSampler {
    pub fn new(source: Box<dyn MetricsSource>, config: &MonitoringConfig) -> Self {
        Self::with_clock(
            source,
            config.interval(),
            config.retention,
            Arc::new(SystemClock),
        )
    }

    pub fn with_clock(
        source: Box<dyn MetricsSource>,
        interval: Duration,
        retention: usize,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            history: Arc::new(ResourceHistory::new(retention)),
            source: Arc::new(Mutex::new(source)),
            clock,
            interval,
            started: AtomicBool::new(false),
        }
    }

    pub fn history(&self) -> &Arc<ResourceHistory> {
        &self.history
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Samples inside `period`, measured back from the sampler's clock.
    pub fn query(&self, period: HistoryPeriod) -> Vec<MetricSample> {
        self.history.query(period.duration(), self.clock.now())
    }

    /// Spawn the sampling loop.
    ///
    /// The first sample is taken immediately. Only the first call spawns a
    /// task; later calls return `None`.
    pub fn start(self: &Arc<Self>, mut shutdown: broadcast::Receiver<()>) -> Option<JoinHandle<()>> {
        if self.started.swap(true, Ordering::SeqCst) {
            tracing::debug!("Resource sampler already running");
            return None;
        }

        let sampler = Arc::clone(self);
        Some(tokio::spawn(async move {
            let mut ticker = time::interval(sampler.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::info!(
                interval = ?sampler.interval,
                retention = sampler.history.capacity(),
                "Resource sampler started"
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        sampler.sample_once().await;
                    }
                    _ = shutdown.recv() => {
                        tracing::debug!("Resource sampler stopping");
                        break;
                    }
                }
            }
        }))
    }

    /// Measure once and append the result.
    ///
    /// Failed dimensions are recorded as zero. The history lock is only held
    /// for the append.
    pub async fn sample_once(&self) -> MetricSample {
        let reading = self.measure(true).await;

        let network = or_zero("network", reading.network);
        let sample = MetricSample {
            timestamp: self.clock.now(),
            cpu_percent: or_zero("cpu", reading.cpu),
            mem_percent: or_zero("memory", reading.memory).percent(),
            disk_percent: or_zero("disk", reading.disk).percent(),
            net_in: network.received,
            net_out: network.transmitted,
        };

        self.history.push(sample.clone());
        metrics::record_resource_sample(&sample);
        sample
    }

    /// Current host view without touching the history.
    ///
    /// CPU comes from the latest sample when there is one, leaving the
    /// interval covered by the next sample intact.
    pub async fn snapshot(&self) -> SystemSnapshot {
        let latest = self.history.latest();
        let reading = self.measure(latest.is_none()).await;
        let cpu_percent = match latest {
            Some(sample) => sample.cpu_percent,
            None => or_zero("cpu", reading.cpu),
        };
        let memory = or_zero("memory", reading.memory);
        let disk = or_zero("disk", reading.disk);

        SystemSnapshot {
            timestamp: self.clock.now(),
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            cpu_cores: reading.cpu_cores,
            cpu_percent,
            mem_total: memory.total,
            mem_used: memory.used,
            mem_free: memory.free,
            mem_percent: memory.percent(),
            disk_total: disk.total,
            disk_used: disk.used,
            disk_free: disk.free,
            disk_percent: disk.percent(),
            uptime_secs: reading.uptime_secs,
        }
    }

    async fn measure(&self, with_cpu: bool) -> Reading {
        let source = Arc::clone(&self.source);
        let task = tokio::task::spawn_blocking(move || {
            let mut source = source.lock().unwrap_or_else(|e| e.into_inner());
            Reading::take(source.as_mut(), with_cpu)
        });

        match task.await {
            Ok(reading) => reading,
            Err(e) => {
                tracing::warn!(error = %e, "Metrics collection task failed");
                Reading::failed(&e.to_string())
            }
        }
    }
}

fn or_zero<T: Default>(dimension: &'static str, value: Result<T, SourceError>) -> T {
    value.unwrap_or_else(|e| {
        tracing::warn!(dimension, error = %e, "Metric collection failed, recording zero");
        metrics::record_sample_failure(dimension);
        T::default()
    })
}
