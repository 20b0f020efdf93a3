//! Core error types for breathroom-core.
//!
//! Errors are layered with thiserror: storage and settings have their own
//! enums, folded into [`CoreError`] at the library boundary.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for breathroom-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// No row with the given identity
    #[error("Session {0} not found")]
    NotFound(i64),

    /// A stored row could not be decoded
    #[error("Corrupt row {id}: {message}")]
    CorruptRow { id: i64, message: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors.
#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    /// Phase count outside the supported layouts
    #[error("Unsupported phase count {0}: sessions have two or three phases")]
    UnsupportedPhaseCount(usize),

    /// More durations than the layout has phases
    #[error("Session has {recorded} durations but only {phase_count} phases")]
    TooManyDurations { recorded: usize, phase_count: usize },

    /// `ended_at` present without the final duration, or the reverse
    #[error("Session end mismatch: ended_at is {ended}, final phase recorded is {complete}")]
    EndMismatch { ended: bool, complete: bool },

    /// Update of a record whose `ended_at` is already set
    #[error("Session {0} is finished and can no longer change")]
    AlreadyEnded(i64),

    /// Update that drops or replaces an already recorded duration
    #[error("Session {id} already recorded phase {index}; durations are set once")]
    DurationRewritten { id: i64, index: usize },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_sqlite_error_maps_to_locked() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: rusqlite::ErrorCode::DatabaseLocked,
                extended_code: 6,
            },
            None,
        );
        assert!(matches!(DatabaseError::from(err), DatabaseError::Locked));
    }

    #[test]
    fn other_sqlite_errors_map_to_query_failed() {
        let err = rusqlite::Error::QueryReturnedNoRows;
        assert!(matches!(
            CoreError::from(err),
            CoreError::Database(DatabaseError::QueryFailed(_))
        ));
    }
}
