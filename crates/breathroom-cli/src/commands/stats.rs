use breathroom_core::stats::{all_time_summary, daily_summary, records_on};
use breathroom_core::{format_duration, Config, Database, DisplayStyle, SessionStore};
use chrono::{Local, NaiveDate};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Statistics for one day (default: today)
    Today {
        /// Day to summarize (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// All-time statistics
    All {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = Database::open()?;
    let style = config.display.style;

    match action {
        StatsAction::Today { date, json } => {
            let date = super::date_or_today(date);
            let records = records_on(&db, date, &Local);
            let summary = daily_summary(date, &records);
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
                return Ok(());
            }
            println!("=== {} ===", date.format("%Y/%m/%d"));
            println!("Sessions:   {}", summary.sessions);
            print_phases(&config, &summary.phase_avg, &summary.phase_best, style);
        }
        StatsAction::All { json } => {
            let records = db.recent(None)?;
            let summary = all_time_summary(&records, &Local);
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
                return Ok(());
            }
            println!("=== All Time ===");
            println!("Sessions:   {}", summary.sessions);
            println!("Days:       {}", summary.days);
            print_phases(&config, &summary.phase_avg, &summary.phase_best, style);
        }
    }
    Ok(())
}

/// Rows are labeled by the widest layout in the aggregate.
fn print_phases(config: &Config, avg: &[f64], best: &[f64], style: DisplayStyle) {
    let labels = config.labels_for(avg.len());
    for (k, (avg, best)) in avg.iter().zip(best).enumerate() {
        let label = labels
            .get(k)
            .cloned()
            .unwrap_or_else(|| format!("record{}", k + 1));
        println!(
            "{label:<10}  avg {}  best {}",
            format_duration(*avg, style),
            format_duration(*best, style)
        );
    }
}
