//! Plain-text export of sessions.
//!
//! ```text
//! 2026/03/01 07:00
//! rechaka: 12.3 秒
//! puraaka: 8.0 秒
//! ```
//!
//! A day export puts the date label first, then each record block,
//! separated by blank lines.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::format::{format_duration, DisplayStyle};
use crate::storage::SessionRecord;

const START_FORMAT: &str = "%Y/%m/%d %H:%M";
const DATE_FORMAT: &str = "%Y/%m/%d";

fn label_for(labels: &[String], index: usize) -> String {
    labels
        .get(index)
        .cloned()
        .unwrap_or_else(|| format!("record{}", index + 1))
}

/// Start time line, then one `label: duration` line per recorded phase.
pub fn share_phases<Tz: TimeZone>(
    started_at: &DateTime<Utc>,
    phase_seconds: &[f64],
    labels: &[String],
    style: DisplayStyle,
    tz: &Tz,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let mut lines = vec![started_at.with_timezone(tz).format(START_FORMAT).to_string()];
    for (k, secs) in phase_seconds.iter().enumerate() {
        lines.push(format!("{}: {}", label_for(labels, k), format_duration(*secs, style)));
    }
    lines.join("\n")
}

pub fn share_record<Tz: TimeZone>(
    record: &SessionRecord,
    labels: &[String],
    style: DisplayStyle,
    tz: &Tz,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    share_phases(&record.started_at, &record.phase_seconds, labels, style, tz)
}

/// Date label, blank line, then record blocks separated by blank lines.
/// Trailing blank lines are stripped. `labels_for` maps a record's phase
/// count to its labels, so days mixing layouts keep the right names.
pub fn share_day<Tz: TimeZone>(
    date: NaiveDate,
    records: &[SessionRecord],
    labels_for: impl Fn(usize) -> Vec<String>,
    style: DisplayStyle,
    tz: &Tz,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let mut out = format!("{}\n\n", date.format(DATE_FORMAT));
    for record in records {
        out.push_str(&share_record(record, &labels_for(record.phase_count), style, tz));
        out.push_str("\n\n");
    }
    out.trim_end_matches('\n').to_string()
}
