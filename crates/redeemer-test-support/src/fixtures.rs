//! Filesystem fixtures.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

/// Temporary directory that plays the role of `tmp_dir`.
pub struct StagingRoot {
    dir: TempDir,
}

impl StagingRoot {
    /// Create a fresh, empty staging root.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary directory cannot be created.
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("redeemer-staging-")
            .tempdir()
            .context("failed to create staging tempdir")?;
        Ok(Self { dir })
    }

    /// Root path of the staging area.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Every regular file below the root, sorted, relative to the root.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree cannot be walked.
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        collect_files(self.path(), self.path(), &mut files)?;
        files.sort();
        Ok(files)
    }
}

fn collect_files(root: &Path, dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }
    for entry in fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(root, &path, files)?;
        } else {
            files.push(path.strip_prefix(root)?.to_path_buf());
        }
    }
    Ok(())
}
