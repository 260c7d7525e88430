//! Typed settings consumed by the store client and the replay pipeline.
//!
//! # Design
//! - Everything here is resolved once at startup and passed by value.
//! - Secrets (`ApiKey`, `StorageConnection`) never print through `Debug`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::defaults::DEFAULT_PACING_MS;
use crate::error::{ConfigError, ConfigResult};
use crate::validate::{validate_api_key, validate_container_folder};

/// Storage account and container addressing the redeemed-bonus objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageProfile {
    /// Name of the storage account.
    pub account_name: String,
    /// Container holding redeemed-bonus payloads.
    pub container: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct StorageProfileFile {
    account_name: Option<String>,
    container: Option<String>,
}

impl StorageProfile {
    /// Resolve the profile from an optional JSON file plus explicit overrides.
    ///
    /// Explicit values win over the file. Blank values count as missing.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or parsed, or when a
    /// field is still missing after merging.
    pub fn resolve(
        profile_path: Option<&Path>,
        account_name: Option<String>,
        container: Option<String>,
    ) -> ConfigResult<Self> {
        let file = match profile_path {
            Some(path) => read_profile_file(path)?,
            None => StorageProfileFile::default(),
        };

        let account_name = non_blank(account_name)
            .or_else(|| non_blank(file.account_name))
            .ok_or(ConfigError::MissingField {
                field: "account_name",
                hint: "pass --storage-account or set REDEEMER_STORAGE_ACCOUNT",
            })?;
        let container = non_blank(container)
            .or_else(|| non_blank(file.container))
            .ok_or(ConfigError::MissingField {
                field: "container",
                hint: "pass --container or set REDEEMER_REDEEMED_CONTAINER",
            })?;

        Ok(Self {
            account_name,
            container,
        })
    }
}

fn read_profile_file(path: &Path) -> ConfigResult<StorageProfileFile> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ProfileRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::ProfileParse {
        path: path.to_path_buf(),
        source,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Connection string for the storage account.
#[derive(Clone, PartialEq, Eq)]
pub struct StorageConnection(String);

impl StorageConnection {
    /// Wrap a raw connection string.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Access the raw connection string.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for StorageConnection {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("StorageConnection(<redacted>)")
    }
}

/// Subscription key sent to the downstream API.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Validate and wrap a raw key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is blank or not a valid header value.
    pub fn parse(raw: &str) -> ConfigResult<Self> {
        validate_api_key(raw).map(|key| Self(key.to_string()))
    }

    /// Access the raw key.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("ApiKey(<redacted>)")
    }
}

/// What to do when a single object fails to download.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DownloadFailurePolicy {
    /// Stop the run; nothing is replayed.
    #[default]
    Abort,
    /// Record a gap in the report and continue with the next object.
    Skip,
}

/// How staged text is turned into the POST body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BodyEncoding {
    /// Wrap the staged text once more as a JSON string value.
    ///
    /// This is what the downstream API has historically received.
    #[default]
    JsonString,
    /// Forward the staged text verbatim.
    Raw,
}

/// Where payloads are staged and how fetch failures are handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingSettings {
    /// Local base directory for staged files.
    pub tmp_dir: PathBuf,
    /// Remote folder prefix; also the subdirectory under `tmp_dir`.
    pub container_folder: String,
    /// Policy for individual download failures.
    pub on_download_error: DownloadFailurePolicy,
}

impl StagingSettings {
    /// Build validated staging settings.
    ///
    /// # Errors
    ///
    /// Returns an error when the folder is blank or escapes `tmp_dir`.
    pub fn new(
        tmp_dir: impl Into<PathBuf>,
        container_folder: &str,
        on_download_error: DownloadFailurePolicy,
    ) -> ConfigResult<Self> {
        let container_folder = validate_container_folder(container_folder)?.to_string();
        Ok(Self {
            tmp_dir: tmp_dir.into(),
            container_folder,
            on_download_error,
        })
    }

    /// Directory that receives the objects listed under the folder prefix.
    #[must_use]
    pub fn staging_dir(&self) -> PathBuf {
        self.tmp_dir.join(&self.container_folder)
    }
}

/// Downstream endpoint, credentials, and pacing for the replay phase.
#[derive(Debug, Clone)]
pub struct ReplaySettings {
    /// Endpoint receiving each replayed payload.
    pub api_url: Url,
    /// Subscription key attached to every request.
    pub api_key: ApiKey,
    /// Wait between consecutive submissions.
    pub pacing: Duration,
    /// Body encoding applied to staged text.
    pub body_encoding: BodyEncoding,
}

impl ReplaySettings {
    /// Settings with the default pacing interval and body encoding.
    #[must_use]
    pub fn new(api_url: Url, api_key: ApiKey) -> Self {
        Self {
            api_url,
            api_key,
            pacing: Duration::from_millis(DEFAULT_PACING_MS),
            body_encoding: BodyEncoding::default(),
        }
    }
}
