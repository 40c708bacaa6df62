// ⚠️ Error taxonomy
// Every failure the engine can report, plus the machine-readable tag callers branch on

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForgeError {
    /// Malformed or out-of-range BIN pattern
    #[error("invalid BIN pattern: {0}")]
    InvalidPattern(String),

    /// Bulk count outside 1..=max
    #[error("count must be between 1 and {max}, got {got}")]
    InvalidCount { got: i64, max: usize },

    /// Generation option out of range (horizon, fixed expiry, CVV length)
    #[error("invalid generation option: {0}")]
    InvalidOptions(String),

    #[error("address dataset is not loaded")]
    DatasetNotLoaded,

    #[error("invalid address dataset: {0}")]
    InvalidDataset(String),

    #[error("no address matches {0}")]
    NoMatchingAddress(String),

    #[error("BIN not found: {0}")]
    NotFound(String),

    /// Deliberately does not say which half of the credential was wrong
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("session expired or unknown")]
    SessionExpired,

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<rusqlite::Error> for ForgeError {
    fn from(err: rusqlite::Error) -> Self {
        ForgeError::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for ForgeError {
    fn from(err: serde_json::Error) -> Self {
        ForgeError::Persistence(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ForgeError>;

// ============================================================================
// ERROR KIND TAG
// ============================================================================

/// Stable tag carried in response envelopes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidPattern,
    InvalidCount,
    InvalidOptions,
    DatasetNotLoaded,
    InvalidDataset,
    NoMatchingAddress,
    NotFound,
    InvalidCredentials,
    SessionExpired,
    Persistence,
    Config,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidPattern => "invalid_pattern",
            ErrorKind::InvalidCount => "invalid_count",
            ErrorKind::InvalidOptions => "invalid_options",
            ErrorKind::DatasetNotLoaded => "dataset_not_loaded",
            ErrorKind::InvalidDataset => "invalid_dataset",
            ErrorKind::NoMatchingAddress => "no_matching_address",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidCredentials => "invalid_credentials",
            ErrorKind::SessionExpired => "session_expired",
            ErrorKind::Persistence => "persistence",
            ErrorKind::Config => "config",
        }
    }
}

impl ForgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ForgeError::InvalidPattern(_) => ErrorKind::InvalidPattern,
            ForgeError::InvalidCount { .. } => ErrorKind::InvalidCount,
            ForgeError::InvalidOptions(_) => ErrorKind::InvalidOptions,
            ForgeError::DatasetNotLoaded => ErrorKind::DatasetNotLoaded,
            ForgeError::InvalidDataset(_) => ErrorKind::InvalidDataset,
            ForgeError::NoMatchingAddress(_) => ErrorKind::NoMatchingAddress,
            ForgeError::NotFound(_) => ErrorKind::NotFound,
            ForgeError::InvalidCredentials => ErrorKind::InvalidCredentials,
            ForgeError::SessionExpired => ErrorKind::SessionExpired,
            ForgeError::Persistence(_) => ErrorKind::Persistence,
            ForgeError::Config(_) => ErrorKind::Config,
        }
    }
}
