use breathroom_core::share::{share_day, share_record};
use breathroom_core::stats::records_on;
use breathroom_core::{Config, Database, SessionStore};
use chrono::{Local, NaiveDate};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum ShareAction {
    /// The most recent session
    Last,
    /// Every session of one day (default: today)
    Day {
        /// Day to export (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

pub fn run(action: ShareAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = Database::open()?;
    let style = config.display.style;

    match action {
        ShareAction::Last => match db.recent(Some(1))?.into_iter().next() {
            Some(record) => {
                let labels = config.labels_for(record.phase_count);
                println!("{}", share_record(&record, &labels, style, &Local));
            }
            None => {
                eprintln!("no sessions recorded");
                std::process::exit(1);
            }
        },
        ShareAction::Day { date } => {
            let date = super::date_or_today(date);
            let records = records_on(&db, date, &Local);
            println!("{}", share_day(date, &records, |n| config.labels_for(n), style, &Local));
        }
    }
    Ok(())
}
