use rusqlite;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MhwimmError {
    #[error("SQLite error: {0}")]
    RusqliteError(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Failed to initialize database: {0}")]
    DatabaseInitializationError(String),
    #[error("Path error: {0}")]
    PathError(String),
    #[error("Config error: {0}")]
    ConfigError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Failures reported by the store layer.
///
/// `Display` is the diagnostic retained by the store until its next call.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("db: error: lack values to be inserted ({field} missing).")]
    Incomplete { field: &'static str },
    #[error("db: error: failed to retrieve data records: {0}")]
    Ask(#[source] rusqlite::Error),
    #[error("db: error: failed to process insert: {0}")]
    Add(#[source] rusqlite::Error),
    #[error("db: error: failed to process delete: {0}")]
    Delete(#[source] rusqlite::Error),
    #[error("db: error: failed to classify {path}: {source}")]
    Classify {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Command-level failures; each renders as the single `error: ...` line
/// shown to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Bad syntax, wrong parameter count, unknown config key. No side effects.
    #[error("error: {0}")]
    Validation(String),
    /// A filesystem operation failed; effects of the same command were rolled back.
    #[error("error: {0}")]
    Effect(String),
    /// A store operation failed. Carries the store diagnostic, which has its
    /// own `db: error:` prefix.
    #[error("{0}")]
    Store(String),
}

impl CommandError {
    pub fn validation(msg: impl Into<String>) -> Self {
        CommandError::Validation(msg.into())
    }

    pub fn effect(msg: impl Into<String>) -> Self {
        CommandError::Effect(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        CommandError::Store(msg.into())
    }
}
