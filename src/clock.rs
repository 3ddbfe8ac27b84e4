//! Time sources shared by the rate limiters and the resource sampler.
//!
//! Everything that reasons about windows or retention reads time through
//! [`Clock`], so tests can drive simulated time with [`ManualClock`].
//! Window arithmetic uses the monotonic [`Clock::instant`]; wall-clock
//! [`Clock::now`] only stamps samples.

use chrono::{DateTime, TimeDelta, Utc};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Source of wall-clock and monotonic time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Monotonic reading; unaffected by wall-clock steps.
    fn instant(&self) -> Instant;
}

/// Clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug)]
struct ManualTime {
    wall: DateTime<Utc>,
    offset: Duration,
}

/// A clock that only moves when told to.
///
/// Clones share the same underlying time, so a test can hand one clone to
/// a limiter and keep another to advance time. [`advance`](Self::advance)
/// moves both readings; [`set`](Self::set) steps the wall clock alone.
#[derive(Debug, Clone)]
pub struct ManualClock {
    base: Instant,
    time: Arc<Mutex<ManualTime>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            base: Instant::now(),
            time: Arc::new(Mutex::new(ManualTime {
                wall: start,
                offset: Duration::ZERO,
            })),
        }
    }

    /// Start at `secs` seconds after the Unix epoch.
    pub fn at_epoch_secs(secs: i64) -> Self {
        Self::new(DateTime::from_timestamp(secs, 0).unwrap_or_default())
    }

    pub fn advance(&self, by: Duration) {
        let delta = TimeDelta::from_std(by).unwrap_or(TimeDelta::MAX);
        let mut time = self.time.lock().unwrap_or_else(|e| e.into_inner());
        time.wall = time.wall.checked_add_signed(delta).unwrap_or(time.wall);
        time.offset = time.offset.saturating_add(by);
    }

    pub fn set(&self, to: DateTime<Utc>) {
        self.time.lock().unwrap_or_else(|e| e.into_inner()).wall = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.time.lock().unwrap_or_else(|e| e.into_inner()).wall
    }

    fn instant(&self) -> Instant {
        let offset = self.time.lock().unwrap_or_else(|e| e.into_inner()).offset;
        self.base + offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_all_clones() {
        let clock = ManualClock::at_epoch_secs(1_000);
        let other = clock.clone();
        let start = other.instant();

        clock.advance(Duration::from_secs(30));

        assert_eq!(other.now().timestamp(), 1_030);
        assert_eq!(other.instant() - start, Duration::from_secs(30));
    }

    #[test]
    fn setting_wall_time_leaves_instant_alone() {
        let clock = ManualClock::at_epoch_secs(10_000);
        let start = clock.instant();

        clock.set(DateTime::from_timestamp(100, 0).unwrap());

        assert_eq!(clock.now().timestamp(), 100);
        assert_eq!(clock.instant(), start);
    }
}
