//! Duration formatting.
//!
//! Display values always truncate toward zero; persisted values keep full
//! precision and only pass through here on the way to a screen.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How durations are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayStyle {
    /// `2分5秒`
    MinuteSecond,
    /// `125.4 秒`
    #[default]
    DecimalSecond,
}

impl DisplayStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayStyle::MinuteSecond => "minute-second",
            DisplayStyle::DecimalSecond => "decimal-second",
        }
    }
}

impl fmt::Display for DisplayStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisplayStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "minute-second" => Ok(DisplayStyle::MinuteSecond),
            "decimal-second" => Ok(DisplayStyle::DecimalSecond),
            other => Err(format!("unknown display style: {other}")),
        }
    }
}

/// Truncate to one decimal place, toward zero. Negative input clamps to 0.
///
/// `12.37 -> 12.3`, `12.39 -> 12.3`.
pub fn truncate_tenths(secs: f64) -> f64 {
    if !secs.is_finite() || secs <= 0.0 {
        return 0.0;
    }
    let scaled = secs * 10.0;
    let below = scaled.floor();
    // Exact tenths can scale to just under the integer (8.2 -> 81.999..);
    // only a few ulps of slack are allowed, so 12.39999999995 stays 12.3.
    let tenths = if below + 1.0 - scaled <= scaled * 4.0 * f64::EPSILON {
        below + 1.0
    } else {
        below
    };
    tenths / 10.0
}

/// `"{value truncated to 1 decimal} 秒"`
pub fn format_decimal(secs: f64) -> String {
    format!("{:.1} 秒", truncate_tenths(secs))
}

/// `"{m}分{s}秒"`, or `"{s}秒"` under a minute. Whole seconds, truncated.
pub fn format_minute_second(secs: f64) -> String {
    let total = whole_seconds(secs);
    let minutes = total / 60;
    let seconds = total % 60;
    if minutes > 0 {
        format!("{minutes}分{seconds}秒")
    } else {
        format!("{seconds}秒")
    }
}

pub fn format_duration(secs: f64, style: DisplayStyle) -> String {
    match style {
        DisplayStyle::MinuteSecond => format_minute_second(secs),
        DisplayStyle::DecimalSecond => format_decimal(secs),
    }
}

fn whole_seconds(secs: f64) -> u64 {
    if !secs.is_finite() || secs <= 0.0 {
        0
    } else {
        secs.trunc() as u64
    }
}
