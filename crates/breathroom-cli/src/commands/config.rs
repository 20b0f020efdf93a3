use breathroom_core::storage::ConfigFile;
use breathroom_core::Config;
use clap::Subcommand;

const KEYS_HELP: &str = "\
Keys:
  timer.start_mode          auto | manual
  timer.layout              two | three
  timer.labels              JSON list, one label per phase
  timer.announce            true | false
  display.style             decimal-second | minute-second
  display.goal_seconds      seconds, 0 disables the highlight
  display.goal_color        red | orange | yellow | green | blue | purple
  display.auto_goal         true | false
  gate.tick_interval_ms     readiness tick
  gate.hang_threshold_ms    tick gap that restarts the warm-up
  gate.required_stable_ms   warm-up length";

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print one setting
    #[command(after_help = KEYS_HELP)]
    Get {
        /// Dot-separated key, e.g. "timer.start_mode"
        key: String,
    },
    /// Change one setting and save it
    #[command(after_help = KEYS_HELP)]
    Set {
        /// Dot-separated key, e.g. "display.goal_seconds"
        key: String,
        /// New value; enum settings only accept their listed names
        value: String,
    },
    /// Print every setting as JSON
    List,
    /// Print the settings file location
    Path,
    /// Restore the default settings
    Reset,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => match Config::load()?.get(&key) {
            Some(value) => println!("{value}"),
            None => {
                eprintln!("unknown key: {key}");
                std::process::exit(1);
            }
        },
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            tracing::info!(%key, %value, "setting saved");
            println!("ok");
        }
        ConfigAction::List => {
            println!("{}", serde_json::to_string_pretty(&Config::load()?)?);
        }
        ConfigAction::Path => {
            println!("{}", ConfigFile::default_location()?.path().display());
        }
        ConfigAction::Reset => {
            Config::default().save()?;
            println!("settings reset to defaults");
        }
    }
    Ok(())
}
