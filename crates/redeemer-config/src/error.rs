//! Error types for configuration resolution.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required value was not supplied by flags, environment, or profile.
    #[error("missing configuration value `{field}`")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
        /// Where the operator can supply the value.
        hint: &'static str,
    },
    /// Field contained an invalid value.
    #[error("invalid configuration field `{field}`: {reason}")]
    InvalidField {
        /// Field that failed validation.
        field: &'static str,
        /// Offending value when available.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// The storage profile file could not be read.
    #[error("failed to read storage profile {}", path.display())]
    ProfileRead {
        /// Profile path.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The storage profile file was not valid JSON.
    #[error("failed to parse storage profile {}", path.display())]
    ProfileParse {
        /// Profile path.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
    /// No resolver produced a connection string for the account.
    #[error("no storage connection string available for account `{account_name}`")]
    ConnectionUnavailable {
        /// Storage account that was being resolved.
        account_name: String,
    },
    /// An external resolver command could not be launched.
    #[error("failed to launch `{program}`")]
    CommandSpawn {
        /// Program that failed to start.
        program: String,
        /// Underlying IO error.
        source: io::Error,
    },
    /// An external resolver command exited unsuccessfully.
    #[error("`{program}` exited unsuccessfully")]
    CommandFailed {
        /// Program that failed.
        program: String,
        /// Exit status code, when the process exited normally.
        status: Option<i32>,
        /// Captured standard error.
        stderr: String,
    },
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
