//! Periodic elapsed-time announcements.
//!
//! A side channel next to the phase machine: it never alters timing, and a
//! busy announcement sink just misses a mark.

/// Seconds between announcements.
pub const ANNOUNCE_EVERY_SECS: u64 = 10;

/// Remembers the last announced bucket of the current phase.
#[derive(Debug, Clone)]
pub struct AnnouncementTracker {
    every_secs: u64,
    last_bucket: Option<u64>,
}

impl AnnouncementTracker {
    pub fn new(every_secs: u64) -> Self {
        Self {
            every_secs: every_secs.max(1),
            last_bucket: None,
        }
    }

    /// Forget the last bucket. Call at the start of every phase.
    pub fn reset(&mut self) {
        self.last_bucket = None;
    }

    /// Feed the running phase's elapsed seconds. Returns the crossed mark
    /// (a multiple of `every_secs`) the first time a new bucket is entered.
    /// The phase start itself is not announced.
    pub fn observe(&mut self, elapsed_secs: f64) -> Option<u64> {
        if !elapsed_secs.is_finite() || elapsed_secs < 0.0 {
            return None;
        }
        let bucket = elapsed_secs.trunc() as u64 / self.every_secs;
        if bucket == 0 {
            return None;
        }
        if self.last_bucket.is_some_and(|last| bucket <= last) {
            return None;
        }
        self.last_bucket = Some(bucket);
        Some(bucket * self.every_secs)
    }
}

impl Default for AnnouncementTracker {
    fn default() -> Self {
        Self::new(ANNOUNCE_EVERY_SECS)
    }
}
