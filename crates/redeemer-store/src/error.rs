//! # Design
//!
//! - Constant-ish messages with the operation and a redacted URL as context.
//! - URLs stored in errors never carry a query string, so SAS tokens stay out of logs.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for object store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised while listing or downloading objects.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The connection string could not be interpreted.
    #[error("invalid storage connection string: {reason}")]
    InvalidConnectionString {
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// The account key was not valid base64.
    #[error("storage account key is not valid base64")]
    InvalidAccountKey {
        /// Underlying decode error.
        source: base64::DecodeError,
    },
    /// An object name cannot be mapped onto a local path.
    #[error("object name `{name}` cannot be staged locally: {reason}")]
    InvalidObjectName {
        /// Offending object name.
        name: String,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// The HTTP request did not complete.
    #[error("{operation} request to {url} failed")]
    Request {
        /// Operation identifier.
        operation: &'static str,
        /// Request URL without its query string.
        url: String,
        /// Underlying HTTP client error.
        source: reqwest::Error,
    },
    /// The store answered with a non-success status.
    #[error("{operation} request to {url} returned status {status}")]
    Status {
        /// Operation identifier.
        operation: &'static str,
        /// Request URL without its query string.
        url: String,
        /// HTTP status code returned by the store.
        status: u16,
    },
    /// A listing page could not be parsed.
    #[error("malformed listing response: {reason}")]
    MalformedListing {
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// Local IO failed while materialising an object.
    #[error("{operation} failed for {}", path.display())]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Local path involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
}
