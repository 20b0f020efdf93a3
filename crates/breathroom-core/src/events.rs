use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{CompletedSession, Phase};

/// Every phase-machine transition and tick side effect produces an Event.
/// The CLI renders them; `--json` callers get them verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Start tapped from idle; the first phase is running.
    SessionStarted { at: DateTime<Utc> },
    /// Start tapped while waiting (manual mode).
    PhaseStarted { index: usize, at: DateTime<Utc> },
    /// A non-final phase stopped. `next` is `Running` in auto mode and
    /// `Waiting` in manual mode.
    PhaseCompleted {
        index: usize,
        seconds: f64,
        next: Phase,
        at: DateTime<Utc>,
    },
    /// The final phase stopped; the session is ready to persist.
    SessionCompleted {
        session: CompletedSession,
        at: DateTime<Utc>,
    },
    /// The completed session was written to the record store.
    SessionSaved {
        id: i64,
        session: CompletedSession,
        at: DateTime<Utc>,
    },
    /// Elapsed time in a running phase crossed a 10-second mark.
    Announcement {
        index: usize,
        seconds: u64,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::SessionStarted { at }
            | Event::PhaseStarted { at, .. }
            | Event::PhaseCompleted { at, .. }
            | Event::SessionCompleted { at, .. }
            | Event::SessionSaved { at, .. }
            | Event::Announcement { at, .. } => *at,
        }
    }
}
