//! In-memory object store double.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use redeemer_store::{ObjectStore, ObjectStream, RemoteObjectRef, StoreError, StoreResult};

#[derive(Default)]
struct State {
    objects: Vec<(String, Vec<u8>)>,
    failing_downloads: HashSet<String>,
    fail_listing: bool,
    listings: usize,
    downloads: Vec<String>,
}

/// Object store backed by an ordered list of `(name, bytes)` pairs.
///
/// Listing returns objects in insertion order, filtered by prefix.
#[derive(Clone, Default)]
pub struct InMemoryObjectStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryObjectStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object; later listings return it after previously added ones.
    #[must_use]
    pub fn with_object(self, name: &str, body: impl Into<Vec<u8>>) -> Self {
        self.lock().objects.push((name.to_string(), body.into()));
        self
    }

    /// Make downloads of `name` fail with a 500 status.
    #[must_use]
    pub fn failing_download(self, name: &str) -> Self {
        self.lock().failing_downloads.insert(name.to_string());
        self
    }

    /// Make enumeration fail before yielding anything.
    #[must_use]
    pub fn failing_listing(self) -> Self {
        self.lock().fail_listing = true;
        self
    }

    /// Number of listings started so far.
    #[must_use]
    pub fn listings(&self) -> usize {
        self.lock().listings
    }

    /// Names passed to `download_object`, in call order.
    #[must_use]
    pub fn downloads(&self) -> Vec<String> {
        self.lock().downloads.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    fn list_objects<'a>(&'a self, prefix: &'a str) -> ObjectStream<'a> {
        let mut state = self.lock();
        state.listings += 1;
        if state.fail_listing {
            return stream::iter([Err::<RemoteObjectRef, _>(StoreError::Status {
                operation: "list_objects",
                url: "memory://objects".to_string(),
                status: 503,
            })])
            .boxed();
        }
        let items: Vec<StoreResult<RemoteObjectRef>> = state
            .objects
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(name, _)| Ok(RemoteObjectRef::new(name.clone())))
            .collect();
        stream::iter(items).boxed()
    }

    async fn download_object(
        &self,
        object: &RemoteObjectRef,
        destination: &Path,
    ) -> StoreResult<u64> {
        let body = {
            let mut state = self.lock();
            state.downloads.push(object.name().to_string());
            if state.failing_downloads.contains(object.name()) {
                return Err(StoreError::Status {
                    operation: "download_object",
                    url: format!("memory://objects/{}", object.name()),
                    status: 500,
                });
            }
            state
                .objects
                .iter()
                .find(|(name, _)| name == object.name())
                .map(|(_, body)| body.clone())
                .ok_or_else(|| StoreError::Status {
                    operation: "download_object",
                    url: format!("memory://objects/{}", object.name()),
                    status: 404,
                })?
        };

        tokio::fs::write(destination, &body)
            .await
            .map_err(|source| StoreError::Io {
                operation: "write_file",
                path: destination.to_path_buf(),
                source,
            })?;
        Ok(u64::try_from(body.len()).unwrap_or(u64::MAX))
    }
}
