//! History aggregates.
//!
//! Day boundaries are taken in a caller-supplied time zone: the CLI passes
//! `Local`, tests pass `Utc`.

use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::{Config, SessionRecord, SessionStore};

/// Aggregates for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub sessions: usize,
    /// Mean duration per phase index, over records that reached it.
    pub phase_avg: Vec<f64>,
    /// Longest duration per phase index.
    pub phase_best: Vec<f64>,
}

/// Aggregates over the whole history.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AllTimeSummary {
    pub sessions: usize,
    pub days: usize,
    pub phase_avg: Vec<f64>,
    pub phase_best: Vec<f64>,
}

/// `[start of date, start of next date)` in `tz`, as UTC instants.
pub fn day_bounds<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = local_midnight(date, tz);
    let end = date
        .checked_add_days(Days::new(1))
        .map(|next| local_midnight(next, tz))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    (start, end)
}

fn local_midnight<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let naive = date.and_time(chrono::NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        // Midnight skipped by a DST jump: fall back to treating it as UTC.
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

/// Calendar date of `at` in `tz`.
pub fn local_date<Tz: TimeZone>(at: &DateTime<Utc>, tz: &Tz) -> NaiveDate {
    at.with_timezone(tz).date_naive()
}

/// Records of `date`, newest first. Store failures degrade to an empty list.
pub fn records_on<S: SessionStore + ?Sized, Tz: TimeZone>(
    store: &S,
    date: NaiveDate,
    tz: &Tz,
) -> Vec<SessionRecord> {
    let (from, to) = day_bounds(date, tz);
    store.in_range(from, to).unwrap_or_else(|e| {
        tracing::warn!(error = %e, %date, "could not fetch records, showing none");
        Vec::new()
    })
}

/// Group records by calendar day, newest day first. Order within a day is
/// kept as given.
pub fn group_by_day<Tz: TimeZone>(
    records: &[SessionRecord],
    tz: &Tz,
) -> Vec<(NaiveDate, Vec<SessionRecord>)> {
    let mut days: Vec<(NaiveDate, Vec<SessionRecord>)> = Vec::new();
    for record in records {
        let date = local_date(&record.started_at, tz);
        match days.iter_mut().find(|(d, _)| *d == date) {
            Some((_, group)) => group.push(record.clone()),
            None => days.push((date, vec![record.clone()])),
        }
    }
    days.sort_by(|a, b| b.0.cmp(&a.0));
    days
}

fn phase_aggregates(records: &[SessionRecord]) -> (Vec<f64>, Vec<f64>) {
    let width = records.iter().map(|r| r.phase_seconds.len()).max().unwrap_or(0);
    let mut sums = vec![0.0; width];
    let mut counts = vec![0usize; width];
    let mut best = vec![0.0f64; width];
    for record in records {
        for (k, secs) in record.phase_seconds.iter().enumerate() {
            sums[k] += secs;
            counts[k] += 1;
            best[k] = best[k].max(*secs);
        }
    }
    let avg = sums
        .iter()
        .zip(&counts)
        .map(|(sum, n)| if *n == 0 { 0.0 } else { sum / *n as f64 })
        .collect();
    (avg, best)
}

pub fn daily_summary(date: NaiveDate, records: &[SessionRecord]) -> DailySummary {
    let (phase_avg, phase_best) = phase_aggregates(records);
    DailySummary {
        date,
        sessions: records.len(),
        phase_avg,
        phase_best,
    }
}

pub fn all_time_summary<Tz: TimeZone>(records: &[SessionRecord], tz: &Tz) -> AllTimeSummary {
    let (phase_avg, phase_best) = phase_aggregates(records);
    AllTimeSummary {
        sessions: records.len(),
        days: group_by_day(records, tz).len(),
        phase_avg,
        phase_best,
    }
}

/// Goal in seconds for the live readout.
///
/// With `auto_goal`, today's best first phase wins; with no sessions today
/// the configured goal is used.
pub fn effective_goal(config: &Config, today: &[SessionRecord]) -> f64 {
    if config.display.auto_goal {
        let best = today
            .iter()
            .filter_map(|r| r.phase(0))
            .fold(None, |acc: Option<f64>, s| Some(acc.map_or(s, |a| a.max(s))));
        if let Some(best) = best {
            return best;
        }
    }
    config.display.goal_seconds.max(0.0)
}
