//! Core error types for meetplan-core.
//!
//! Failures are split by where they originate: bad caller input is rejected
//! before any fetch, store failures are propagated untouched, and scoring never
//! fails. An empty suggestion list is not an error.

use std::path::PathBuf;
use thiserror::Error;

use chrono::{DateTime, Utc};

/// Top-level error for scheduling operations.
#[derive(Error, Debug)]
pub enum SchedulingError {
    /// Invalid request, rejected before any data is fetched
    #[error("Invalid input: {0}")]
    Input(#[from] InputError),

    /// Availability or meeting store failure
    #[error("Data source error: {0}")]
    DataSource(#[from] DataSourceError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The caller abandoned the request while fetches were in flight
    #[error("Scheduling request was cancelled")]
    Cancelled,
}

/// Request validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    /// Duration must be positive and at most one week
    #[error("Invalid duration: {minutes} minutes (must be between 1 and 10080)")]
    InvalidDuration { minutes: i64 },

    /// No participants were requested
    #[error("At least one participant is required")]
    NoParticipants,

    /// Invalid time range
    #[error("Invalid time range: end ({end}) must be greater than start ({start})")]
    InvalidTimeRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// Daily window could not be parsed or is empty
    #[error("Invalid daily window: {0}")]
    InvalidWindow(String),

    /// A search window or slot would fall outside the representable calendar
    #[error("Date out of range: {0}")]
    OutOfRange(String),
}

/// Errors raised while reading from a scheduling store.
#[derive(Error, Debug)]
pub enum DataSourceError {
    /// The store could not be reached
    #[error("Store '{store}' is unreachable: {message}")]
    Unreachable { store: String, message: String },

    /// A fetch did not complete within its deadline
    #[error("Fetching {operation} timed out after {timeout_ms} ms")]
    Timeout { operation: String, timeout_ms: u64 },

    /// The store returned data that violates the model
    #[error("Malformed data from store: {0}")]
    Malformed(String),

    /// A store query failed
    #[error("Query failed: {0}")]
    Query(String),
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

    /// Unknown dotted key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

impl From<rusqlite::Error> for DataSourceError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _msg)
                if code.code == rusqlite::ErrorCode::CannotOpen =>
            {
                DataSourceError::Unreachable {
                    store: "sqlite".to_string(),
                    message: err.to_string(),
                }
            }
            rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::InvalidColumnType(..) => DataSourceError::Malformed(err.to_string()),
            _ => DataSourceError::Query(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for DataSourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DataSourceError::Malformed(err.to_string())
        } else if err.is_timeout() {
            // The deadline lives on the client; callers that know it map this themselves
            DataSourceError::Unreachable {
                store: "rest".to_string(),
                message: format!("request timed out: {err}"),
            }
        } else {
            DataSourceError::Unreachable {
                store: "rest".to_string(),
                message: err.to_string(),
            }
        }
    }
}

impl From<rusqlite::Error> for SchedulingError {
    fn from(err: rusqlite::Error) -> Self {
        SchedulingError::DataSource(err.into())
    }
}

/// Result type alias for SchedulingError
pub type Result<T, E = SchedulingError> = std::result::Result<T, E>;
