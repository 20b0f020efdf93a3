pub mod config;
pub mod history;
pub mod session;
pub mod share;
pub mod stats;

use chrono::{Local, NaiveDate};

/// `--date` argument, defaulting to today in the local zone.
pub fn date_or_today(date: Option<NaiveDate>) -> NaiveDate {
    date.unwrap_or_else(|| Local::now().date_naive())
}
