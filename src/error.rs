//! Error types for tasklink
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, unknown task, bad config)
//! - 4: Operation failed (io, corrupt data, lock contention)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the tasklink CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for tasklink operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Ambiguous task id '{0}': matches more than one task")]
    AmbiguousTaskId(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Malformed share data: {0}")]
    MalformedShareData(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(#[from] url::ParseError),

    // Operation failures (exit code 4)
    #[error("Corrupt stored record '{key}': {reason}")]
    CorruptStoredRecord { key: String, reason: String },

    #[error("Session is closed")]
    SessionClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::TaskNotFound(_)
            | Error::AmbiguousTaskId(_)
            | Error::InvalidArgument(_)
            | Error::InvalidConfig(_)
            | Error::MalformedShareData(_)
            | Error::InvalidAddress(_) => exit_codes::USER_ERROR,

            Error::CorruptStoredRecord { .. }
            | Error::SessionClosed
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::LockFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Structured details for machine-readable output
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::TaskNotFound(id) | Error::AmbiguousTaskId(id) => {
                Some(serde_json::json!({ "id": id }))
            }
            Error::CorruptStoredRecord { key, reason } => {
                Some(serde_json::json!({ "key": key, "reason": reason }))
            }
            Error::InvalidConfig(message)
            | Error::InvalidArgument(message)
            | Error::MalformedShareData(message) => {
                Some(serde_json::json!({ "message": message }))
            }
            Error::LockFailed(path) => {
                Some(serde_json::json!({ "path": path.display().to_string() }))
            }
            _ => None,
        }
    }
}

/// Result type alias for tasklink operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            details: err.details(),
        }
    }
}
