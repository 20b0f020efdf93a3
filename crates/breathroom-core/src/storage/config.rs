//! TOML-based settings.
//!
//! Stores user preferences:
//! - Start mode (auto / manual) and phase layout (two / three phases)
//! - Display style, goal duration and goal highlight color
//! - Readiness gate constants
//!
//! Settings live at `<data dir>/config.toml`. Enum-valued settings decode
//! leniently: an unknown or corrupt stored value falls back to the
//! variant's default instead of failing the whole file.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use super::data_dir;
use crate::display::GoalColor;
use crate::error::ConfigError;
use crate::format::DisplayStyle;
use crate::timer::{GateConfig, StartMode};

/// Current on-disk settings format.
pub const SETTINGS_VERSION: u32 = 1;

/// Number of phases per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    #[default]
    Two,
    Three,
}

impl LayoutKind {
    pub fn phase_count(&self) -> usize {
        match self {
            LayoutKind::Two => 2,
            LayoutKind::Three => 3,
        }
    }

    pub fn default_labels(&self) -> &'static [&'static str] {
        match self {
            LayoutKind::Two => &["rechaka", "puraaka"],
            LayoutKind::Three => &["rechaka", "kumbhaka", "puraaka"],
        }
    }
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LayoutKind::Two => "two",
            LayoutKind::Three => "three",
        })
    }
}

impl FromStr for LayoutKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "two" => Ok(LayoutKind::Two),
            "three" => Ok(LayoutKind::Three),
            other => Err(format!("unknown layout: {other}")),
        }
    }
}

/// Phase machine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default, deserialize_with = "or_default")]
    pub start_mode: StartMode,
    #[serde(default, deserialize_with = "or_default")]
    pub layout: LayoutKind,
    /// Custom phase labels; ignored unless there is one per phase.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Announce every 10 seconds while a phase runs.
    #[serde(default = "default_true")]
    pub announce: bool,
}

/// Readout settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default, deserialize_with = "or_default")]
    pub style: DisplayStyle,
    /// Goal in seconds; 0 disables the highlight.
    #[serde(default)]
    pub goal_seconds: f64,
    #[serde(default, deserialize_with = "or_default")]
    pub goal_color: GoalColor,
    /// Derive the goal from today's best first phase.
    #[serde(default)]
    pub auto_goal: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data dir>/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub gate: GateConfig,
}

fn default_true() -> bool {
    true
}
fn default_version() -> u32 {
    SETTINGS_VERSION
}

/// Decode an enum from its string form, falling back to its default.
fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Default,
    T::Err: fmt::Display,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw.parse().unwrap_or_else(|e: T::Err| {
        tracing::warn!(value = %raw, error = %e, "unknown setting value, using default");
        T::default()
    }))
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            start_mode: StartMode::default(),
            layout: LayoutKind::default(),
            labels: Vec::new(),
            announce: true,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            style: DisplayStyle::default(),
            goal_seconds: 0.0,
            goal_color: GoalColor::default(),
            auto_goal: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            timer: TimerConfig::default(),
            display: DisplayConfig::default(),
            gate: GateConfig::default(),
        }
    }
}

/// Read-only access to a settings snapshot.
///
/// Components take a snapshot per decision instead of holding a live
/// reference to the backing store.
pub trait SettingsProvider {
    fn snapshot(&self) -> Config;
}

impl SettingsProvider for Config {
    fn snapshot(&self) -> Config {
        self.clone()
    }
}

/// Settings backed by a TOML file, re-read on every snapshot.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
}

impl ConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file in the data directory.
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be created.
    pub fn default_location() -> std::io::Result<Self> {
        Ok(Self::new(Config::path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsProvider for ConfigFile {
    fn snapshot(&self) -> Config {
        Config::load_from(&self.path).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "settings unreadable, using defaults");
            Config::default()
        })
    }
}

impl Config {
    /// Number of phases per session.
    pub fn phase_count(&self) -> usize {
        self.timer.layout.phase_count()
    }

    /// One label per phase: the custom labels if they fit, else the layout's.
    pub fn labels(&self) -> Vec<String> {
        if self.timer.labels.len() == self.phase_count() {
            self.timer.labels.clone()
        } else {
            self.timer
                .layout
                .default_labels()
                .iter()
                .map(|s| s.to_string())
                .collect()
        }
    }

    /// Labels for a record with `phase_count` phases, which may predate the
    /// current layout.
    pub fn labels_for(&self, phase_count: usize) -> Vec<String> {
        if phase_count == self.phase_count() {
            return self.labels();
        }
        let layout = if phase_count == 3 {
            LayoutKind::Three
        } else {
            LayoutKind::Two
        };
        layout.default_labels().iter().map(|s| s.to_string()).collect()
    }

    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> std::io::Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the data directory, writing defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("config.toml"),
            message: e.to_string(),
        })?;
        Self::load_from(&path)
    }

    /// Load from `path`, writing defaults there if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or the
    /// defaults cannot be written.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config =
                    toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
                Ok(cfg.upgraded())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    fn upgraded(mut self) -> Self {
        if self.version > SETTINGS_VERSION {
            tracing::warn!(
                found = self.version,
                supported = SETTINGS_VERSION,
                "settings written by a newer version; unknown values use defaults"
            );
        } else if self.version < SETTINGS_VERSION {
            tracing::info!(from = self.version, to = SETTINGS_VERSION, "upgrading settings");
            self.version = SETTINGS_VERSION;
        }
        self
    }

    /// Persist to the data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path().map_err(|e| ConfigError::SaveFailed {
            path: PathBuf::from("config.toml"),
            message: e.to_string(),
        })?;
        self.save_to(&path)
    }

    /// Persist to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key, in memory only.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit it.
    /// Enum values must name a variant; the lenient decoding used for files
    /// does not apply here.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        if let Some(serde_json::Value::String(_)) = serde_json::to_value(&updated)
            .ok()
            .as_ref()
            .and_then(|j| Self::get_json_value_by_path(j, key))
        {
            if updated.get(key).as_deref() != Some(value) {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("'{value}' is not an accepted value"),
                });
            }
        }
        *self = updated;
        Ok(())
    }
}
