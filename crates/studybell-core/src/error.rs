//! Core error types for studybell-core.
//!
//! Errors are grouped by the subsystem that raises them. The reminder engine
//! itself never returns an error to its caller; the types here are used at the
//! edges (storage, configuration, audio output, notifications, extraction).

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for studybell-core.
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

    /// Audio output errors
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    /// Platform notification errors
    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    /// Image-to-schedule extraction errors
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
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

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// Username already taken
    #[error("User '{0}' already exists")]
    UserExists(String),

    /// Unknown user
    #[error("User '{0}' not found")]
    UserNotFound(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Data directory could not be resolved or created
    #[error("Cannot prepare data directory {path}: {message}")]
    DataDir { path: PathBuf, message: String },

    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Time of day not in `HH:mm` form
    #[error("Invalid time '{0}': expected HH:mm")]
    InvalidTime(String),

    /// Unknown weekday label
    #[error("Unknown weekday '{0}'")]
    InvalidWeekday(String),

    /// Unknown exam tag
    #[error("Unknown exam tag '{0}'")]
    InvalidTag(String),

    /// Empty required field
    #[error("Field '{0}' must not be empty")]
    EmptyField(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Audio output errors. Never escape tone playback; logged and dropped.
#[derive(Error, Debug)]
pub enum AudioError {
    /// Output device or file could not be created
    #[error("Audio output unavailable: {0}")]
    Unavailable(String),

    /// Output exists but could not be resumed
    #[error("Audio output could not be resumed: {0}")]
    ResumeFailed(String),

    /// Output was shut down
    #[error("Audio output closed")]
    Closed,

    /// WAV encoding failed
    #[error("WAV encoding failed: {0}")]
    Encode(#[from] hound::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Platform notification errors.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Permission not granted
    #[error("Notification permission not granted")]
    NotPermitted,

    /// Delivery failed
    #[error("Notification delivery failed: {0}")]
    DeliveryFailed(String),
}

/// Errors from the image-to-schedule collaborator.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// No API key configured
    #[error("No API key configured for schedule extraction")]
    MissingApiKey,

    /// HTTP transport failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Service answered with a non-success status
    #[error("Service returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Response did not contain a usable schedule list
    #[error("Response did not contain a schedule list")]
    InvalidResponse,

    /// All attempts exhausted
    #[error("No schedule entries recognized after {attempts} attempts; try a sharper or tighter-cropped image")]
    Unrecognized { attempts: u32 },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) if e.code == rusqlite::ErrorCode::DatabaseLocked => {
                DatabaseError::Locked
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
