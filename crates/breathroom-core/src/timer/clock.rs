//! Time sources for the gate and the phase machine.
//!
//! Every captured instant is a [`Moment`]: the wall-clock time is kept for
//! labels and persisted timestamps, while interval arithmetic uses the
//! monotonic offset so clock adjustments never leak into durations.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// A captured instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moment {
    /// Wall-clock time, for display and persistence.
    pub wall: DateTime<Utc>,
    /// Monotonic offset from the clock's origin, for durations.
    pub mono: Duration,
}

impl Moment {
    pub fn new(wall: DateTime<Utc>, mono: Duration) -> Self {
        Self { wall, mono }
    }

    /// A moment `secs` after `origin`, on both time bases.
    pub fn offset_from(origin: DateTime<Utc>, secs: f64) -> Self {
        let mono = Duration::from_secs_f64(secs.max(0.0));
        let wall = origin + chrono::Duration::milliseconds((secs * 1000.0).round() as i64);
        Self { wall, mono }
    }

    /// Signed seconds from `earlier` to `self`. Negative if `earlier` is
    /// actually later.
    pub fn seconds_since(&self, earlier: &Moment) -> f64 {
        self.mono.as_secs_f64() - earlier.mono.as_secs_f64()
    }
}

/// Source of [`Moment`]s.
pub trait Clock: Send + Sync {
    fn now(&self) -> Moment;
}

/// Process clock: `tokio::time::Instant` for the monotonic base (so paused
/// test runtimes drive it too) and `Utc::now()` for the wall clock.
#[derive(Debug)]
pub struct SystemClock {
    origin: tokio::time::Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Moment {
        Moment {
            wall: Utc::now(),
            mono: self.origin.elapsed(),
        }
    }
}

/// Hand-driven clock for tests and replays.
#[derive(Debug)]
pub struct ManualClock {
    origin: DateTime<Utc>,
    elapsed: Mutex<Duration>,
}

impl ManualClock {
    pub fn new(origin: DateTime<Utc>) -> Self {
        Self {
            origin,
            elapsed: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut elapsed = self.elapsed.lock().unwrap_or_else(|e| e.into_inner());
        *elapsed += by;
    }

    pub fn set_secs(&self, secs: f64) {
        let mut elapsed = self.elapsed.lock().unwrap_or_else(|e| e.into_inner());
        *elapsed = Duration::from_secs_f64(secs.max(0.0));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Moment {
        let elapsed = *self.elapsed.lock().unwrap_or_else(|e| e.into_inner());
        Moment::offset_from(self.origin, elapsed.as_secs_f64())
    }
}
