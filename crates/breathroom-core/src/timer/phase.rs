//! Phase state machine.
//!
//! Tracks one breathing session across two or three user-triggered phases.
//! Like the gate, it holds no thread: every operation takes the caller's
//! `now`.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -Start-> Running(0) -Stop(0)-> Running(1)            (auto)
//!                          -Stop(0)-> Waiting(1) -Start-> Running(1)  (manual)
//! Running(last) -Stop(last)-> Idle  (session completed)
//! ```
//!
//! Transitions outside their enabling condition are silent no-ops.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::clock::Moment;
use crate::error::ValidationError;
use crate::events::Event;
use crate::format::truncate_tenths;

/// Where the machine is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    /// Phase `k` (zero-based) is being timed.
    Running(usize),
    /// Phase `k` finished its predecessor and waits for Start (manual mode).
    Waiting(usize),
}

/// Whether the next phase begins on its own when the previous one stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartMode {
    #[default]
    Auto,
    Manual,
}

impl fmt::Display for StartMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StartMode::Auto => "auto",
            StartMode::Manual => "manual",
        })
    }
}

impl FromStr for StartMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(StartMode::Auto),
            "manual" => Ok(StartMode::Manual),
            other => Err(format!("unknown start mode: {other}")),
        }
    }
}

/// A user-facing button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    /// Stop phase `k`.
    Stop(usize),
}

/// Result of the final transition, kept for display and sharing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedSession {
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub phase_seconds: Vec<f64>,
}

pub const MIN_PHASES: usize = 2;
pub const MAX_PHASES: usize = 3;

#[derive(Debug, Clone)]
pub struct PhaseMachine {
    phase_count: usize,
    phase: Phase,
    started_at: Option<Moment>,
    /// `boundaries[k]` is when phase `k` began.
    boundaries: Vec<Option<Moment>>,
    /// Durations of the current (or most recently completed) session.
    last_durations: Vec<Option<f64>>,
    last_completed: Option<CompletedSession>,
}

impl PhaseMachine {
    /// # Errors
    /// Returns an error unless `phase_count` is two or three.
    pub fn new(phase_count: usize) -> Result<Self, ValidationError> {
        if !(MIN_PHASES..=MAX_PHASES).contains(&phase_count) {
            return Err(ValidationError::UnsupportedPhaseCount(phase_count));
        }
        Ok(Self {
            phase_count,
            phase: Phase::Idle,
            started_at: None,
            boundaries: vec![None; phase_count],
            last_durations: vec![None; phase_count],
            last_completed: None,
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn phase_count(&self) -> usize {
        self.phase_count
    }

    pub fn started_at(&self) -> Option<Moment> {
        self.started_at
    }

    pub fn boundary(&self, index: usize) -> Option<Moment> {
        self.boundaries.get(index).copied().flatten()
    }

    pub fn last_duration(&self, index: usize) -> Option<f64> {
        self.last_durations.get(index).copied().flatten()
    }

    pub fn last_durations(&self) -> &[Option<f64>] {
        &self.last_durations
    }

    pub fn last_completed(&self) -> Option<&CompletedSession> {
        self.last_completed.as_ref()
    }

    fn last_index(&self) -> usize {
        self.phase_count - 1
    }

    /// Enablement is a pure function of `(ready, phase)`.
    pub fn is_enabled(&self, ready: bool, action: Action) -> bool {
        action_enabled(ready, self.phase, action)
    }

    /// The one action a single-key driver fires.
    pub fn primary_action(&self) -> Action {
        match self.phase {
            Phase::Idle | Phase::Waiting(_) => Action::Start,
            Phase::Running(k) => Action::Stop(k),
        }
    }

    /// Full-precision seconds in the running phase; 0 otherwise. Never negative.
    pub fn elapsed_secs(&self, now: &Moment) -> f64 {
        match self.phase {
            Phase::Idle | Phase::Waiting(_) => 0.0,
            Phase::Running(k) => self
                .boundary(k)
                .map(|b| now.seconds_since(&b).max(0.0))
                .unwrap_or(0.0),
        }
    }

    /// The live readout: elapsed truncated to one decimal.
    pub fn elapsed_display(&self, now: &Moment) -> f64 {
        truncate_tenths(self.elapsed_secs(now))
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn apply(&mut self, action: Action, now: Moment, mode: StartMode) -> Option<Event> {
        match action {
            Action::Start => self.start(now),
            Action::Stop(k) => self.stop(k, now, mode),
        }
    }

    pub fn start(&mut self, now: Moment) -> Option<Event> {
        match self.phase {
            Phase::Idle => {
                self.started_at = Some(now);
                self.boundaries = vec![None; self.phase_count];
                self.boundaries[0] = Some(now);
                self.last_durations = vec![None; self.phase_count];
                self.phase = Phase::Running(0);
                Some(Event::SessionStarted { at: now.wall })
            }
            Phase::Waiting(k) => {
                self.started_at?;
                self.boundaries[k] = Some(now);
                self.phase = Phase::Running(k);
                Some(Event::PhaseStarted {
                    index: k,
                    at: now.wall,
                })
            }
            Phase::Running(_) => {
                tracing::debug!(phase = ?self.phase, "start ignored while running");
                None
            }
        }
    }

    pub fn stop(&mut self, index: usize, now: Moment, mode: StartMode) -> Option<Event> {
        if self.phase != Phase::Running(index) {
            tracing::debug!(phase = ?self.phase, index, "stop ignored");
            return None;
        }
        let Some(boundary) = self.boundary(index) else {
            tracing::debug!(index, "stop ignored: phase has no start boundary");
            return None;
        };
        let seconds = now.seconds_since(&boundary).max(0.0);

        if index == self.last_index() {
            return self.finish(seconds, now);
        }

        self.last_durations[index] = Some(seconds);
        let next_index = index + 1;
        let next = match mode {
            StartMode::Auto => {
                self.boundaries[next_index] = Some(now);
                Phase::Running(next_index)
            }
            StartMode::Manual => {
                self.boundaries[next_index] = None;
                Phase::Waiting(next_index)
            }
        };
        self.phase = next;
        Some(Event::PhaseCompleted {
            index,
            seconds,
            next,
            at: now.wall,
        })
    }

    fn finish(&mut self, seconds: f64, now: Moment) -> Option<Event> {
        let started_at = self.started_at?;
        let last = self.last_index();
        self.last_durations[last] = Some(seconds);

        let phase_seconds: Option<Vec<f64>> = self.last_durations.iter().copied().collect();
        let Some(phase_seconds) = phase_seconds else {
            tracing::debug!("finish ignored: an earlier phase has no duration");
            self.last_durations[last] = None;
            return None;
        };

        let session = CompletedSession {
            started_at: started_at.wall,
            ended_at: now.wall,
            phase_seconds,
        };
        self.phase = Phase::Idle;
        self.boundaries = vec![None; self.phase_count];
        self.last_completed = Some(session.clone());
        Some(Event::SessionCompleted {
            session,
            at: now.wall,
        })
    }
}

/// Start: ready and idle or waiting. Stop(k): ready and running phase k.
pub fn action_enabled(ready: bool, phase: Phase, action: Action) -> bool {
    if !ready {
        return false;
    }
    match action {
        Action::Start => matches!(phase, Phase::Idle | Phase::Waiting(_)),
        Action::Stop(k) => phase == Phase::Running(k),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn origin() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 7, 0, 0).unwrap()
    }

    fn at(secs: f64) -> Moment {
        Moment::offset_from(origin(), secs)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn rejects_unsupported_phase_counts() {
        assert!(PhaseMachine::new(1).is_err());
        assert!(PhaseMachine::new(4).is_err());
        assert!(PhaseMachine::new(2).is_ok());
        assert!(PhaseMachine::new(3).is_ok());
    }

    #[test]
    fn auto_mode_scenario() {
        let mut m = PhaseMachine::new(2).unwrap();
        assert!(matches!(m.start(at(0.0)), Some(Event::SessionStarted { .. })));
        assert_eq!(m.phase(), Phase::Running(0));

        let ev = m.stop(0, at(12.37), StartMode::Auto);
        assert!(matches!(ev, Some(Event::PhaseCompleted { index: 0, next: Phase::Running(1), .. })));
        assert!(close(m.last_duration(0).unwrap(), 12.37));
        assert_eq!(m.boundary(1), Some(at(12.37)));

        let ev = m.stop(1, at(20.39), StartMode::Auto).unwrap();
        match ev {
            Event::SessionCompleted { session, .. } => {
                assert!(close(session.phase_seconds[0], 12.37));
                assert!(close(session.phase_seconds[1], 8.02));
                assert_eq!(session.started_at, origin());
                assert_eq!(session.ended_at, at(20.39).wall);
            }
            other => panic!("Expected SessionCompleted, got {other:?}"),
        }
        assert_eq!(m.phase(), Phase::Idle);
        assert!(close(m.last_duration(1).unwrap(), 8.02));
        assert_eq!(m.started_at(), Some(at(0.0)));
    }

    #[test]
    fn manual_mode_waits_and_measures_from_second_start() {
        let mut m = PhaseMachine::new(2).unwrap();
        m.start(at(0.0));
        m.stop(0, at(12.37), StartMode::Manual);
        assert_eq!(m.phase(), Phase::Waiting(1));
        assert_eq!(m.boundary(1), None);
        assert_eq!(m.elapsed_display(&at(14.0)), 0.0);

        assert!(matches!(m.start(at(15.0)), Some(Event::PhaseStarted { index: 1, .. })));
        assert_eq!(m.phase(), Phase::Running(1));

        match m.stop(1, at(23.0), StartMode::Manual) {
            Some(Event::SessionCompleted { session, .. }) => {
                assert!(close(session.phase_seconds[1], 8.0));
            }
            other => panic!("Expected SessionCompleted, got {other:?}"),
        }
    }

    #[test]
    fn three_phase_layout_records_in_order() {
        let mut m = PhaseMachine::new(3).unwrap();
        m.start(at(0.0));
        m.stop(0, at(5.0), StartMode::Auto);
        assert!(m.stop(2, at(6.0), StartMode::Auto).is_none());
        m.stop(1, at(15.0), StartMode::Auto);
        assert_eq!(m.phase(), Phase::Running(2));
        match m.stop(2, at(18.5), StartMode::Auto) {
            Some(Event::SessionCompleted { session, .. }) => {
                assert_eq!(session.phase_seconds.len(), 3);
                assert!(close(session.phase_seconds[0], 5.0));
                assert!(close(session.phase_seconds[1], 10.0));
                assert!(close(session.phase_seconds[2], 3.5));
            }
            other => panic!("Expected SessionCompleted, got {other:?}"),
        }
    }

    #[test]
    fn new_session_clears_previous_durations() {
        let mut m = PhaseMachine::new(2).unwrap();
        m.start(at(0.0));
        m.stop(0, at(3.0), StartMode::Auto);
        m.stop(1, at(4.0), StartMode::Auto);
        m.start(at(10.0));
        assert_eq!(m.last_duration(0), None);
        assert_eq!(m.last_duration(1), None);
        assert!(m.last_completed().is_some());
    }

    #[test]
    fn invalid_transitions_are_no_ops() {
        let mut m = PhaseMachine::new(2).unwrap();
        assert!(m.stop(0, at(1.0), StartMode::Auto).is_none());
        assert!(m.stop(1, at(1.0), StartMode::Auto).is_none());
        m.start(at(0.0));
        assert!(m.start(at(1.0)).is_none());
        assert!(m.stop(1, at(1.0), StartMode::Auto).is_none());
        assert_eq!(m.phase(), Phase::Running(0));
        assert_eq!(m.started_at(), Some(at(0.0)));
    }

    #[test]
    fn elapsed_truncates_and_clamps() {
        let mut m = PhaseMachine::new(2).unwrap();
        assert_eq!(m.elapsed_display(&at(3.0)), 0.0);
        m.start(at(5.0));
        assert_eq!(m.elapsed_display(&at(17.37)), 12.3);
        assert_eq!(m.elapsed_display(&at(17.39)), 12.3);
        // Clock anomaly: now before the boundary.
        assert_eq!(m.elapsed_display(&at(3.0)), 0.0);
        m.stop(0, at(10.0), StartMode::Auto);
        assert!(close(m.elapsed_secs(&at(12.5)), 2.5));
    }

    #[test]
    fn enablement_table() {
        let phases = [Phase::Idle, Phase::Running(0), Phase::Waiting(1), Phase::Running(1)];
        for ready in [false, true] {
            for phase in phases {
                let start = action_enabled(ready, phase, Action::Start);
                let stop0 = action_enabled(ready, phase, Action::Stop(0));
                let stop1 = action_enabled(ready, phase, Action::Stop(1));
                let expected = match (ready, phase) {
                    (false, _) => (false, false, false),
                    (true, Phase::Idle) | (true, Phase::Waiting(_)) => (true, false, false),
                    (true, Phase::Running(0)) => (false, true, false),
                    (true, Phase::Running(_)) => (false, false, true),
                };
                assert_eq!((start, stop0, stop1), expected, "ready={ready} phase={phase:?}");
            }
        }
    }

    #[test]
    fn primary_action_follows_phase() {
        let mut m = PhaseMachine::new(2).unwrap();
        assert_eq!(m.primary_action(), Action::Start);
        m.start(at(0.0));
        assert_eq!(m.primary_action(), Action::Stop(0));
        m.stop(0, at(1.0), StartMode::Manual);
        assert_eq!(m.primary_action(), Action::Start);
    }
}
