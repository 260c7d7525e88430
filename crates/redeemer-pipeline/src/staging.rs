//! Local staging area shared by the fetch and replay phases.

use std::path::{Path, PathBuf};

use redeemer_config::StagingSettings;
use redeemer_store::{RemoteObjectRef, StoreError};

use crate::error::{PipelineError, PipelineResult};

/// One downloaded object on local disk. Read-only once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    object: RemoteObjectRef,
    path: PathBuf,
}

impl StagedFile {
    /// Object this file was downloaded from.
    #[must_use]
    pub const fn object(&self) -> &RemoteObjectRef {
        &self.object
    }

    /// Local path holding the object's bytes.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Directory tree receiving downloaded objects.
///
/// Objects land at `tmp_dir/<object name>`; since names carry the folder
/// prefix, everything listed for a folder ends up below `tmp_dir/<folder>`.
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
    folder_dir: PathBuf,
}

impl StagingArea {
    /// Staging area described by `settings`.
    #[must_use]
    pub fn new(settings: &StagingSettings) -> Self {
        Self {
            root: settings.tmp_dir.clone(),
            folder_dir: settings.staging_dir(),
        }
    }

    /// Directory for the configured folder.
    #[must_use]
    pub fn folder_dir(&self) -> &Path {
        &self.folder_dir
    }

    /// Create the folder directory and its parents if absent.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Staging`] if the directory cannot be created.
    pub async fn prepare(&self) -> PipelineResult<()> {
        tokio::fs::create_dir_all(&self.folder_dir)
            .await
            .map_err(|source| PipelineError::Staging {
                path: self.folder_dir.clone(),
                source,
            })
    }

    /// Deterministic local path for `object`, with its parent directory created.
    ///
    /// # Errors
    ///
    /// Returns a store error when the name cannot be mapped safely or the
    /// parent directory cannot be created.
    pub(crate) async fn allocate(&self, object: &RemoteObjectRef) -> Result<StagedFile, StoreError> {
        let path = self.root.join(object.relative_path()?);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Io {
                    operation: "create_parent_dir",
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        Ok(StagedFile {
            object: object.clone(),
            path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redeemer_config::DownloadFailurePolicy;

    fn area(root: &Path) -> StagingArea {
        let settings = StagingSettings::new(root, "2024-bonus", DownloadFailurePolicy::Abort)
            .expect("valid settings");
        StagingArea::new(&settings)
    }

    #[tokio::test]
    async fn prepare_creates_nested_folder() {
        let dir = tempfile::tempdir().expect("tempdir");
        let area = area(&dir.path().join("deep/tmp"));
        area.prepare().await.expect("prepare succeeds");
        assert!(area.folder_dir().is_dir());
        area.prepare().await.expect("prepare is idempotent");
    }

    #[tokio::test]
    async fn allocate_mirrors_object_name_under_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let area = area(dir.path());
        let staged = area
            .allocate(&RemoteObjectRef::new("2024-bonus/sub/a.json"))
            .await
            .expect("allocates");
        assert_eq!(staged.path(), dir.path().join("2024-bonus/sub/a.json"));
        assert!(dir.path().join("2024-bonus/sub").is_dir());
    }

    #[tokio::test]
    async fn allocate_rejects_escaping_names() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = area(dir.path())
            .allocate(&RemoteObjectRef::new("../outside.json"))
            .await
            .expect_err("traversal rejected");
        assert!(matches!(err, StoreError::InvalidObjectName { .. }));
    }
}
