//! The object store seam consumed by the fetch phase.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::error::{StoreError, StoreResult};

/// Lazily enumerated object references.
pub type ObjectStream<'a> = BoxStream<'a, StoreResult<RemoteObjectRef>>;

/// One object in the store, identified by its folder-scoped name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObjectRef {
    name: String,
}

impl RemoteObjectRef {
    /// Reference an object by name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Folder-scoped object name, e.g. `2024-bonus/a.json`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Relative local path mirroring the object name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidObjectName`] for names that are empty,
    /// absolute, or would climb out of the directory they are joined onto.
    pub fn relative_path(&self) -> StoreResult<PathBuf> {
        let invalid = |reason| StoreError::InvalidObjectName {
            name: self.name.clone(),
            reason,
        };
        if self.name.is_empty() {
            return Err(invalid("empty"));
        }
        if self.name.ends_with('/') {
            return Err(invalid("directory_marker"));
        }

        let mut relative = PathBuf::new();
        for component in Path::new(&self.name).components() {
            match component {
                Component::Normal(part) => relative.push(part),
                Component::CurDir => {}
                Component::ParentDir => return Err(invalid("parent_traversal")),
                Component::RootDir | Component::Prefix(_) => return Err(invalid("absolute")),
            }
        }
        if relative.as_os_str().is_empty() {
            return Err(invalid("empty"));
        }
        Ok(relative)
    }
}

/// Remote object listing and download primitives.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Enumerate objects whose names start with `prefix`, in store order.
    ///
    /// Pages are requested only as the stream is polled; any page failure
    /// surfaces as an `Err` item.
    fn list_objects<'a>(&'a self, prefix: &'a str) -> ObjectStream<'a>;

    /// Write the full content of `object` to `destination`, replacing any
    /// existing file. Returns the number of bytes written.
    async fn download_object(
        &self,
        object: &RemoteObjectRef,
        destination: &Path,
    ) -> StoreResult<u64>;
}
