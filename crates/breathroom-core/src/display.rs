//! Derived display state.
//!
//! Everything here is a pure function of the latest [`ClockSignal`], the
//! phase machine and a settings snapshot, recomputed on every tick.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::format::format_duration;
use crate::storage::Config;
use crate::timer::{action_enabled, Action, ClockSignal, Phase, PhaseMachine};

/// Palette for the goal highlight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalColor {
    #[default]
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
}

impl GoalColor {
    pub const ALL: [GoalColor; 6] = [
        GoalColor::Red,
        GoalColor::Orange,
        GoalColor::Yellow,
        GoalColor::Green,
        GoalColor::Blue,
        GoalColor::Purple,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GoalColor::Red => "red",
            GoalColor::Orange => "orange",
            GoalColor::Yellow => "yellow",
            GoalColor::Green => "green",
            GoalColor::Blue => "blue",
            GoalColor::Purple => "purple",
        }
    }

    /// 256-color ANSI foreground code.
    pub fn ansi_code(&self) -> u8 {
        match self {
            GoalColor::Red => 196,
            GoalColor::Orange => 208,
            GoalColor::Yellow => 226,
            GoalColor::Green => 46,
            GoalColor::Blue => 33,
            GoalColor::Purple => 129,
        }
    }
}

impl fmt::Display for GoalColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GoalColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GoalColor::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown goal color: {s}"))
    }
}

/// Goal applies to the first phase. 0 (or less) disables it.
pub fn goal_reached(phase: Phase, elapsed_secs: f64, goal_secs: f64) -> bool {
    goal_secs > 0.0 && phase == Phase::Running(0) && elapsed_secs >= goal_secs
}

/// One frame of the live view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Readout {
    pub phase: Phase,
    /// Label of the running or waiting phase.
    pub label: Option<String>,
    /// Truncated elapsed seconds.
    pub elapsed: f64,
    pub text: String,
    pub highlight: Option<GoalColor>,
    pub ready: bool,
    pub start_enabled: bool,
    /// `stop_enabled[k]` for each phase's stop button.
    pub stop_enabled: Vec<bool>,
}

pub fn readout(
    machine: &PhaseMachine,
    signal: &ClockSignal,
    config: &Config,
    goal_secs: f64,
) -> Readout {
    let phase = machine.phase();
    let labels = config.labels();
    let label = match phase {
        Phase::Idle => None,
        Phase::Running(k) | Phase::Waiting(k) => labels.get(k).cloned(),
    };
    let elapsed = machine.elapsed_display(&signal.now);
    let highlight = goal_reached(phase, elapsed, goal_secs).then_some(config.display.goal_color);

    Readout {
        phase,
        label,
        elapsed,
        text: format_duration(elapsed, config.display.style),
        highlight,
        ready: signal.ready,
        start_enabled: action_enabled(signal.ready, phase, Action::Start),
        stop_enabled: (0..machine.phase_count())
            .map(|k| action_enabled(signal.ready, phase, Action::Stop(k)))
            .collect(),
    }
}
