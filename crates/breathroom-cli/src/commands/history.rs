use breathroom_core::stats::{group_by_day, records_on};
use breathroom_core::{format_duration, Config, Database, SessionStore};
use chrono::Local;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List recorded sessions, grouped by day
    List {
        /// Only today's sessions
        #[arg(long)]
        today: bool,
        /// Maximum number of sessions
        #[arg(long)]
        limit: Option<usize>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a recorded session
    Delete {
        /// Session id
        id: i64,
    },
}

pub fn run(action: HistoryAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let mut db = Database::open()?;

    match action {
        HistoryAction::List { today, limit, json } => {
            let mut records = if today {
                records_on(&db, super::date_or_today(None), &Local)
            } else {
                db.recent(limit)?
            };
            if let Some(limit) = limit {
                records.truncate(limit);
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
                return Ok(());
            }
            if records.is_empty() {
                println!("No sessions recorded.");
                return Ok(());
            }

            let style = config.display.style;
            for (date, group) in group_by_day(&records, &Local) {
                println!("{}  ({} sessions)", date.format("%Y/%m/%d"), group.len());
                for record in group {
                    let labels = config.labels_for(record.phase_count);
                    let phases: Vec<String> = record
                        .phase_seconds
                        .iter()
                        .enumerate()
                        .map(|(k, secs)| {
                            let label = labels.get(k).map_or("record", String::as_str);
                            format!("{label} {}", format_duration(*secs, style))
                        })
                        .collect();
                    println!(
                        "  #{:<5} {}  {}",
                        record.id,
                        record.started_at.with_timezone(&Local).format("%H:%M"),
                        phases.join("  ")
                    );
                }
            }
        }
        HistoryAction::Delete { id } => {
            if db.delete(id)? {
                tracing::info!(id, "session deleted");
                println!("deleted session #{id}");
            } else {
                eprintln!("no session with id {id}");
                std::process::exit(1);
            }
        }
    }
    Ok(())
}
