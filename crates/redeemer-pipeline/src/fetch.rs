//! Download phase: enumerate the folder and stage every object locally.

use futures_util::StreamExt;
use redeemer_config::DownloadFailurePolicy;
use redeemer_store::{ObjectStore, RemoteObjectRef, StoreError};
use tracing::{info, warn};

use crate::error::{PipelineError, PipelineResult};
use crate::report::DownloadGap;
use crate::staging::{StagedFile, StagingArea};

/// Files staged by one download phase, in listing order.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Objects materialised on disk.
    pub staged: Vec<StagedFile>,
    /// Objects skipped under [`DownloadFailurePolicy::Skip`].
    pub gaps: Vec<DownloadGap>,
}

/// Lists objects under a prefix and downloads each one, sequentially.
pub struct Fetcher<'a> {
    store: &'a dyn ObjectStore,
    staging: &'a StagingArea,
    policy: DownloadFailurePolicy,
}

impl<'a> Fetcher<'a> {
    /// Fetcher writing into `staging`.
    #[must_use]
    pub const fn new(
        store: &'a dyn ObjectStore,
        staging: &'a StagingArea,
        policy: DownloadFailurePolicy,
    ) -> Self {
        Self {
            store,
            staging,
            policy,
        }
    }

    /// Download every object whose name starts with `prefix`.
    ///
    /// Rerunning over the same listing yields the same local paths and
    /// overwrites their contents.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Listing`] when enumeration fails, and
    /// [`PipelineError::Download`] for the first failed object unless the
    /// policy is [`DownloadFailurePolicy::Skip`].
    pub async fn fetch_all(&self, prefix: &str) -> PipelineResult<FetchOutcome> {
        let mut outcome = FetchOutcome::default();
        let mut objects = self.store.list_objects(prefix);

        while let Some(next) = objects.next().await {
            let object = next.map_err(|source| PipelineError::Listing {
                prefix: prefix.to_string(),
                source,
            })?;

            match self.stage(&object).await {
                Ok(staged) => outcome.staged.push(staged),
                Err(source) if self.policy == DownloadFailurePolicy::Skip => {
                    warn!(object = object.name(), error = %source, "skipping object");
                    outcome.gaps.push(DownloadGap::new(object.name(), &source));
                }
                Err(source) => {
                    return Err(PipelineError::Download {
                        object: object.name().to_string(),
                        source,
                    });
                }
            }
        }

        info!(
            prefix,
            staged = outcome.staged.len(),
            skipped = outcome.gaps.len(),
            "download phase finished"
        );
        Ok(outcome)
    }

    async fn stage(&self, object: &RemoteObjectRef) -> Result<StagedFile, StoreError> {
        let staged = self.staging.allocate(object).await?;
        let bytes = self.store.download_object(object, staged.path()).await?;
        info!(
            object = object.name(),
            path = %staged.path().display(),
            bytes,
            "staged object"
        );
        Ok(staged)
    }
}
