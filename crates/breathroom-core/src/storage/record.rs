//! The persisted session record and the store seam.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};
use crate::timer::{CompletedSession, MAX_PHASES, MIN_PHASES};

/// One start-to-finish breathing cycle.
///
/// `phase_seconds[k]` is `record{k+1}Seconds`; durations are filled in
/// order, and `ended_at` is set exactly when the last one is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Store-assigned identity; 0 before insertion.
    pub id: i64,
    pub started_at: DateTime<Utc>,
    pub phase_count: usize,
    pub phase_seconds: Vec<f64>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl SessionRecord {
    /// A record holding only its start, for stores that insert early.
    pub fn begin(started_at: DateTime<Utc>, phase_count: usize) -> Self {
        Self {
            id: 0,
            started_at,
            phase_count,
            phase_seconds: Vec::new(),
            ended_at: None,
        }
    }

    pub fn from_completed(session: &CompletedSession) -> Self {
        Self {
            id: 0,
            started_at: session.started_at,
            phase_count: session.phase_seconds.len(),
            phase_seconds: session.phase_seconds.clone(),
            ended_at: Some(session.ended_at),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.ended_at.is_some()
    }

    /// Duration of phase `index`, if recorded.
    pub fn phase(&self, index: usize) -> Option<f64> {
        self.phase_seconds.get(index).copied()
    }

    /// Record the next phase's duration. The final one also stamps `ended_at`.
    ///
    /// # Errors
    /// Returns an error if every phase is already recorded.
    pub fn record_phase(&mut self, seconds: f64, at: DateTime<Utc>) -> Result<(), ValidationError> {
        if self.phase_seconds.len() >= self.phase_count {
            return Err(ValidationError::TooManyDurations {
                recorded: self.phase_seconds.len() + 1,
                phase_count: self.phase_count,
            });
        }
        self.phase_seconds.push(seconds);
        if self.phase_seconds.len() == self.phase_count {
            self.ended_at = Some(at);
        }
        Ok(())
    }

    /// Check the ordering and completion invariants.
    ///
    /// # Errors
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(MIN_PHASES..=MAX_PHASES).contains(&self.phase_count) {
            return Err(ValidationError::UnsupportedPhaseCount(self.phase_count));
        }
        if self.phase_seconds.len() > self.phase_count {
            return Err(ValidationError::TooManyDurations {
                recorded: self.phase_seconds.len(),
                phase_count: self.phase_count,
            });
        }
        if let Some(bad) = self
            .phase_seconds
            .iter()
            .find(|s| !s.is_finite() || **s < 0.0)
        {
            return Err(ValidationError::InvalidValue {
                field: "phase_seconds".into(),
                message: format!("{bad} is not a non-negative duration"),
            });
        }
        let complete = self.phase_seconds.len() == self.phase_count;
        let ended = self.ended_at.is_some();
        if complete != ended {
            return Err(ValidationError::EndMismatch { ended, complete });
        }
        Ok(())
    }

    /// Check that `next` only extends this stored record: no change once
    /// ended, and recorded durations stay as they are.
    ///
    /// # Errors
    /// Returns the violated lifecycle rule.
    pub fn check_update(&self, next: &SessionRecord) -> Result<(), ValidationError> {
        if self.ended_at.is_some() {
            return Err(ValidationError::AlreadyEnded(self.id));
        }
        let kept = next.phase_seconds.get(..self.phase_seconds.len());
        if kept != Some(self.phase_seconds.as_slice()) {
            let index = self
                .phase_seconds
                .iter()
                .zip(&next.phase_seconds)
                .position(|(a, b)| a != b)
                .unwrap_or(next.phase_seconds.len());
            return Err(ValidationError::DurationRewritten { id: self.id, index });
        }
        Ok(())
    }
}

/// Abstract record store.
///
/// Ordered queries return newest `started_at` first.
pub trait SessionStore {
    /// Insert and return the assigned id.
    fn insert(&mut self, record: &SessionRecord) -> Result<i64>;

    /// Append durations (and the end) to an existing, unfinished record.
    /// Recorded durations and finished records never change.
    fn update(&mut self, record: &SessionRecord) -> Result<()>;

    fn get(&self, id: i64) -> Result<Option<SessionRecord>>;

    /// Records whose `started_at` falls in `[from, to)`.
    fn in_range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<SessionRecord>>;

    /// Newest first, optionally capped.
    fn recent(&self, limit: Option<usize>) -> Result<Vec<SessionRecord>>;

    /// Returns whether a record was removed.
    fn delete(&mut self, id: i64) -> Result<bool>;
}
