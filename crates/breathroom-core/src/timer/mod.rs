mod announce;
mod clock;
mod gate;
mod phase;

pub use announce::{AnnouncementTracker, ANNOUNCE_EVERY_SECS};
pub use clock::{Clock, ManualClock, Moment, SystemClock};
pub use gate::{ClockSignal, GateConfig, GateHandle, ReadinessGate};
pub use phase::{
    action_enabled, Action, CompletedSession, Phase, PhaseMachine, StartMode, MAX_PHASES,
    MIN_PHASES,
};
