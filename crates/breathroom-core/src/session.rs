//! Session controller: the phase machine wired to the gate, the record
//! store and a settings snapshot.
//!
//! Taps are only honored while the latest [`ClockSignal`] says ready and the
//! action is enabled. The final stop persists the record; if the store
//! fails the machine still returns to idle and keeps the measurement as
//! the last completed session.

use chrono::{Local, TimeZone};

use crate::error::Result;
use crate::events::Event;
use crate::stats::{local_date, records_on};
use crate::storage::{Config, SessionRecord, SessionStore};
use crate::timer::{Action, AnnouncementTracker, ClockSignal, Phase, PhaseMachine};

pub struct SessionController<S: SessionStore> {
    machine: PhaseMachine,
    store: S,
    announcer: AnnouncementTracker,
}

impl<S: SessionStore> SessionController<S> {
    /// # Errors
    /// Returns an error if the configured layout is not two or three phases.
    pub fn new(store: S, config: &Config) -> Result<Self> {
        Ok(Self {
            machine: PhaseMachine::new(config.phase_count())?,
            store,
            announcer: AnnouncementTracker::default(),
        })
    }

    pub fn machine(&self) -> &PhaseMachine {
        &self.machine
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fire `action` at `signal.now`.
    ///
    /// Returns `Ok(None)` when the tap is ignored (gate not ready, action
    /// disabled). A completed session comes back as [`Event::SessionSaved`].
    ///
    /// # Errors
    /// Returns the store error if the completed session could not be saved.
    pub fn tap(&mut self, action: Action, signal: &ClockSignal, config: &Config) -> Result<Option<Event>> {
        if !self.machine.is_enabled(signal.ready, action) {
            tracing::debug!(?action, ready = signal.ready, phase = ?self.machine.phase(), "tap ignored");
            return Ok(None);
        }

        let Some(event) = self.machine.apply(action, signal.now, config.timer.start_mode) else {
            return Ok(None);
        };

        match &event {
            Event::SessionStarted { .. } | Event::PhaseStarted { .. } => self.announcer.reset(),
            Event::PhaseCompleted { next: Phase::Running(_), .. } => self.announcer.reset(),
            _ => {}
        }

        if let Event::SessionCompleted { session, at } = event {
            let record = SessionRecord::from_completed(&session);
            return match self.store.insert(&record) {
                Ok(id) => Ok(Some(Event::SessionSaved { id, session, at })),
                Err(e) => {
                    tracing::error!(error = %e, "failed to save completed session");
                    Err(e)
                }
            };
        }

        tracing::debug!(?event, "phase transition");
        Ok(Some(event))
    }

    /// Fire whichever action the current phase offers.
    ///
    /// # Errors
    /// See [`SessionController::tap`].
    pub fn tap_primary(&mut self, signal: &ClockSignal, config: &Config) -> Result<Option<Event>> {
        let action = self.machine.primary_action();
        self.tap(action, signal, config)
    }

    /// Per-tick side effects: the 10-second announcement.
    pub fn on_tick(&mut self, signal: &ClockSignal, config: &Config) -> Option<Event> {
        if !config.timer.announce {
            return None;
        }
        let Phase::Running(index) = self.machine.phase() else {
            return None;
        };
        let seconds = self.announcer.observe(self.machine.elapsed_secs(&signal.now))?;
        Some(Event::Announcement {
            index,
            seconds,
            at: signal.now.wall,
        })
    }

    /// Today's records in `tz`, newest first; empty if the store fails.
    pub fn today_in<Tz: TimeZone>(&self, signal: &ClockSignal, tz: &Tz) -> Vec<SessionRecord> {
        records_on(&self.store, local_date(&signal.now.wall, tz), tz)
    }

    /// Today's records in the local time zone.
    pub fn today(&self, signal: &ClockSignal) -> Vec<SessionRecord> {
        self.today_in(signal, &Local)
    }
}
