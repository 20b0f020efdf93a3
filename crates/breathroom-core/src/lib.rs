//! # Breathroom Core Library
//!
//! Core logic for the Breathroom breathing-practice interval timer. A
//! session is two or three user-triggered phases (rechaka / puraaka, with
//! an optional kumbhaka); the library times them, persists completed
//! sessions and derives history statistics. The `breathroom` CLI is a thin
//! driver over the same types.
//!
//! ## Architecture
//!
//! - **Readiness Gate**: a tick loop that opens only after the scheduler has
//!   delivered hiccup-free ticks for a while; publishes `(now, ready)` on a
//!   watch channel
//! - **Phase Machine**: a threadless state machine over monotonic
//!   [`Moment`]s; the caller supplies `now`
//! - **Session Controller**: gate + machine + record store + settings
//!   snapshot
//! - **Storage**: SQLite session storage and TOML-based settings
//!
//! ## Key Components
//!
//! - [`ReadinessGate`]: readiness heuristic and tick loop
//! - [`PhaseMachine`]: phase transitions and elapsed readout
//! - [`SessionController`]: tap handling and persistence
//! - [`Database`]: session persistence
//! - [`Config`]: settings

pub mod display;
pub mod error;
pub mod events;
pub mod format;
pub mod session;
pub mod share;
pub mod stats;
pub mod storage;
pub mod timer;

pub use display::{readout, GoalColor, Readout};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::Event;
pub use format::{format_duration, DisplayStyle};
pub use session::SessionController;
pub use storage::{Config, Database, MemoryStore, SessionRecord, SessionStore};
pub use timer::{
    Action, ClockSignal, Moment, Phase, PhaseMachine, ReadinessGate, StartMode, SystemClock,
};
