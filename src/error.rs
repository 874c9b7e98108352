//! Error taxonomy for the registration bot
//!
//! Each concern gets its own enum so callers can decide what is fatal:
//! - `ConfigError`: startup configuration problems
//! - `ValidationError`: bad form input, reported to the submitter only
//! - `StorageError`: registration store failures, never retried
//! - `TransportError`: platform API failures
//!
//! Eligibility denials are not errors; see [`crate::eligibility::Decision`].

use crate::platform::ChannelId;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("Failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Registration channel {channel} is not reachable: {reason}")]
    ChannelUnavailable { channel: ChannelId, reason: String },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Primary name is required")]
    EmptyPrimaryName,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Failed to prepare database directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("Submitter id {0} does not fit in an SQLite integer")]
    IdOutOfRange(u64),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Failed to decode response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
}

/// Failure of a form submission. Either the input was rejected or the row
/// could not be written.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Failure of the prompt startup sequence.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error(transparent)]
    Configuration(#[from] ConfigError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}
