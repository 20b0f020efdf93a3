mod config;
pub mod database;
mod memory;
mod record;

pub use config::{Config, ConfigFile, DisplayConfig, LayoutKind, SettingsProvider, TimerConfig, SETTINGS_VERSION};
pub use database::Database;
pub use memory::MemoryStore;
pub use record::{SessionRecord, SessionStore};

use std::path::PathBuf;

/// Returns the data directory, creating it if needed.
///
/// `BREATHROOM_DATA_DIR` overrides the location; otherwise it is
/// `~/.config/breathroom[-dev]/`, with `BREATHROOM_ENV=dev` selecting the
/// development directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("BREATHROOM_DATA_DIR") {
        Some(custom) => PathBuf::from(custom),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("BREATHROOM_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("breathroom-dev")
            } else {
                base_dir.join("breathroom")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
