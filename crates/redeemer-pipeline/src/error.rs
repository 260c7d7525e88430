//! # Design
//!
//! - One variant per fatal category of the run.
//! - Every variant carries the item it was working on so the operator can
//!   rerun or inspect it.

use std::io;
use std::path::PathBuf;

use redeemer_store::StoreError;
use thiserror::Error;

use crate::replay::TransportError;

/// Result alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Fatal pipeline failures; any of these aborts the run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The staging directory could not be created.
    #[error("failed to prepare staging directory {}", path.display())]
    Staging {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Enumerating remote objects failed.
    #[error("failed to list objects under prefix `{prefix}`")]
    Listing {
        /// Folder prefix being listed.
        prefix: String,
        /// Underlying store error.
        source: StoreError,
    },
    /// A single object could not be staged.
    #[error("failed to download object `{object}`")]
    Download {
        /// Object name.
        object: String,
        /// Underlying store error.
        source: StoreError,
    },
    /// A staged file could not be read back.
    #[error("failed to read staged file {}", path.display())]
    StagedRead {
        /// Staged file path.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The downstream call for a staged file did not complete.
    #[error("failed to replay staged file {}", path.display())]
    Transport {
        /// Staged file path.
        path: PathBuf,
        /// Underlying transport error.
        source: TransportError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn errors_name_the_item_and_keep_sources() {
        let cases = vec![
            (
                PipelineError::Staging {
                    path: PathBuf::from("tmp/2024-bonus"),
                    source: io::Error::other("read-only"),
                },
                "failed to prepare staging directory tmp/2024-bonus",
            ),
            (
                PipelineError::Listing {
                    prefix: "2024-bonus".into(),
                    source: StoreError::MalformedListing { reason: "x" },
                },
                "failed to list objects under prefix `2024-bonus`",
            ),
            (
                PipelineError::Download {
                    object: "2024-bonus/a.json".into(),
                    source: StoreError::MalformedListing { reason: "x" },
                },
                "failed to download object `2024-bonus/a.json`",
            ),
            (
                PipelineError::StagedRead {
                    path: PathBuf::from("tmp/2024-bonus/a.json"),
                    source: io::Error::other("gone"),
                },
                "failed to read staged file tmp/2024-bonus/a.json",
            ),
            (
                PipelineError::Transport {
                    path: PathBuf::from("tmp/2024-bonus/a.json"),
                    source: TransportError::Send {
                        source: io::Error::other("connection refused").into(),
                    },
                },
                "failed to replay staged file tmp/2024-bonus/a.json",
            ),
        ];

        for (err, message) in cases {
            assert_eq!(err.to_string(), message);
            assert!(err.source().is_some());
        }
    }
}
