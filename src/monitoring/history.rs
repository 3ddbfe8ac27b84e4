//! Bounded, time-ordered sample buffer.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::monitoring::sample::MetricSample;

/// Query windows offered to the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum HistoryPeriod {
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[default]
    #[serde(rename = "1h")]
    OneHour,
}

impl HistoryPeriod {
    /// Parse a period selector. Unknown selectors fall back to one hour.
    pub fn parse_or_default(raw: &str) -> Self {
        match raw {
            "5m" => HistoryPeriod::FiveMinutes,
            "15m" => HistoryPeriod::FifteenMinutes,
            "30m" => HistoryPeriod::ThirtyMinutes,
            _ => HistoryPeriod::OneHour,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryPeriod::FiveMinutes => "5m",
            HistoryPeriod::FifteenMinutes => "15m",
            HistoryPeriod::ThirtyMinutes => "30m",
            HistoryPeriod::OneHour => "1h",
        }
    }

    pub fn duration(&self) -> Duration {
        let minutes = match self {
            HistoryPeriod::FiveMinutes => 5,
            HistoryPeriod::FifteenMinutes => 15,
            HistoryPeriod::ThirtyMinutes => 30,
            HistoryPeriod::OneHour => 60,
        };
        Duration::from_secs(minutes * 60)
    }
}

/// Ring buffer of the most recent samples.
///
/// Appends and queries take the same lock, so a reader sees either all of a
/// sample or none of it. Once full, each append evicts exactly the oldest
/// sample.
#[derive(Debug)]
pub struct ResourceHistory {
    samples: Mutex<VecDeque<MetricSample>>,
    capacity: usize,
}

impl ResourceHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn push(&self, sample: MetricSample) {
        let mut samples = self.lock();
        if samples.len() == self.capacity {
            samples.pop_front();
        }
        samples.push_back(sample);
    }

    /// Samples with `timestamp >= now - period`, oldest first.
    pub fn query(&self, period: Duration, now: DateTime<Utc>) -> Vec<MetricSample> {
        let cutoff = TimeDelta::from_std(period)
            .ok()
            .and_then(|period| now.checked_sub_signed(period));

        self.lock()
            .iter()
            .filter(|sample| cutoff.map_or(true, |cutoff| sample.timestamp >= cutoff))
            .cloned()
            .collect()
    }

    pub fn latest(&self) -> Option<MetricSample> {
        self.lock().back().cloned()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<MetricSample>> {
        self.samples.lock().unwrap_or_else(|e| e.into_inner())
    }
}
