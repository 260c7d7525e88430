//! Phase sequencing for one reprocessing run.

use std::sync::Arc;

use redeemer_config::StagingSettings;
use redeemer_store::ObjectStore;
use tracing::{info, instrument};

use crate::error::PipelineResult;
use crate::fetch::Fetcher;
use crate::replay::ReplayEngine;
use crate::report::{ReplayReport, ReportBuilder};
use crate::staging::StagingArea;

/// Download everything, then replay everything, then report.
///
/// Replay starts only after the download phase has finished; any fatal error
/// ends the run without a report.
pub struct Pipeline {
    store: Arc<dyn ObjectStore>,
    engine: ReplayEngine,
    staging: StagingSettings,
}

impl Pipeline {
    /// Pipeline reading from `store` and replaying through `engine`.
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, engine: ReplayEngine, staging: StagingSettings) -> Self {
        Self {
            store,
            engine,
            staging,
        }
    }

    /// Execute the run.
    ///
    /// # Errors
    ///
    /// Propagates the first fatal error from staging, listing, downloading,
    /// reading staged files, or submitting them.
    #[instrument(name = "pipeline.run", skip(self), fields(folder = %self.staging.container_folder))]
    pub async fn run(&self) -> PipelineResult<ReplayReport> {
        let area = StagingArea::new(&self.staging);
        area.prepare().await?;

        let fetched = Fetcher::new(
            self.store.as_ref(),
            &area,
            self.staging.on_download_error,
        )
        .fetch_all(&self.staging.container_folder)
        .await?;

        let mut report = ReportBuilder::new();
        for gap in fetched.gaps {
            report.record_gap(gap);
        }

        info!(files = fetched.staged.len(), "replay phase starting");
        self.engine.replay_all(&fetched.staged, &mut report).await?;

        let report = report.finish();
        info!(
            replayed = report.replayed(),
            skipped = report.gaps().len(),
            "run complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::replay::{SubmitResponse, Submitter, TransportError};
    use async_trait::async_trait;
    use redeemer_config::{BodyEncoding, DownloadFailurePolicy};
    use redeemer_test_support::fixtures::StagingRoot;
    use redeemer_test_support::mocks::InMemoryObjectStore;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Echoes a fixed status and remembers every body.
    #[derive(Default)]
    struct RecordingSubmitter {
        bodies: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Submitter for RecordingSubmitter {
        async fn submit(&self, body: String) -> Result<SubmitResponse, TransportError> {
            self.bodies.lock().expect("bodies lock").push(body);
            Ok(SubmitResponse {
                status: 202,
                body: String::new(),
            })
        }
    }

    fn pipeline(
        store: InMemoryObjectStore,
        submitter: Arc<RecordingSubmitter>,
        root: &StagingRoot,
        policy: DownloadFailurePolicy,
    ) -> Pipeline {
        let staging =
            StagingSettings::new(root.path(), "2024-bonus", policy).expect("valid settings");
        let engine = ReplayEngine::new(submitter, Duration::ZERO, BodyEncoding::JsonString);
        Pipeline::new(Arc::new(store), engine, staging)
    }

    #[tokio::test]
    async fn downloads_then_replays_in_listing_order() {
        let root = StagingRoot::new().expect("staging root");
        let store = InMemoryObjectStore::new()
            .with_object("2024-bonus/a.json", "{\"id\":1}")
            .with_object("2024-bonus/b.json", "{\"id\":2}");
        let submitter = Arc::new(RecordingSubmitter::default());

        let report = pipeline(store.clone(), submitter.clone(), &root, DownloadFailurePolicy::Abort)
            .run()
            .await
            .expect("run succeeds");

        let files: Vec<_> = report.outcomes().iter().map(|o| o.source_file.clone()).collect();
        assert_eq!(
            files,
            [
                root.path().join("2024-bonus/a.json"),
                root.path().join("2024-bonus/b.json")
            ]
        );
        assert!(report.outcomes().iter().all(|o| o.status_code == "202"));
        assert_eq!(
            *submitter.bodies.lock().expect("bodies lock"),
            [r#""{\"id\":1}""#, r#""{\"id\":2}""#]
        );
        assert_eq!(store.downloads().len(), 2);
    }

    #[tokio::test]
    async fn empty_folder_yields_empty_report() {
        let root = StagingRoot::new().expect("staging root");
        let submitter = Arc::new(RecordingSubmitter::default());

        let report = pipeline(
            InMemoryObjectStore::new(),
            submitter.clone(),
            &root,
            DownloadFailurePolicy::Abort,
        )
        .run()
        .await
        .expect("run succeeds");

        assert_eq!(report, ReplayReport::default());
        assert!(root.path().join("2024-bonus").is_dir());
        assert!(submitter.bodies.lock().expect("bodies lock").is_empty());
    }

    #[tokio::test]
    async fn download_failure_prevents_any_replay() {
        let root = StagingRoot::new().expect("staging root");
        let store = InMemoryObjectStore::new()
            .with_object("2024-bonus/a.json", "a")
            .with_object("2024-bonus/b.json", "b")
            .failing_download("2024-bonus/b.json");
        let submitter = Arc::new(RecordingSubmitter::default());

        let err = pipeline(store, submitter.clone(), &root, DownloadFailurePolicy::Abort)
            .run()
            .await
            .expect_err("download failure is fatal");

        assert!(matches!(err, PipelineError::Download { .. }));
        assert!(submitter.bodies.lock().expect("bodies lock").is_empty());
        assert_eq!(
            root.files().expect("files"),
            [PathBuf::from("2024-bonus/a.json")]
        );
    }

    #[tokio::test]
    async fn skipped_downloads_are_reported_as_gaps() {
        let root = StagingRoot::new().expect("staging root");
        let store = InMemoryObjectStore::new()
            .with_object("2024-bonus/a.json", "a")
            .with_object("2024-bonus/b.json", "b")
            .failing_download("2024-bonus/a.json");
        let submitter = Arc::new(RecordingSubmitter::default());

        let report = pipeline(store, submitter, &root, DownloadFailurePolicy::Skip)
            .run()
            .await
            .expect("run continues");

        assert_eq!(report.replayed(), 1);
        assert_eq!(report.gaps().len(), 1);
        assert_eq!(report.gaps()[0].object(), "2024-bonus/a.json");
    }

    #[tokio::test]
    async fn unusable_staging_directory_is_fatal() {
        let root = StagingRoot::new().expect("staging root");
        let blocker = root.path().join("blocked");
        std::fs::write(&blocker, "not a directory").expect("write blocker");
        let staging = StagingSettings::new(&blocker, "2024-bonus", DownloadFailurePolicy::Abort)
            .expect("valid settings");
        let store = InMemoryObjectStore::new().with_object("2024-bonus/a.json", "a");
        let engine = ReplayEngine::new(
            Arc::new(RecordingSubmitter::default()),
            Duration::ZERO,
            BodyEncoding::Raw,
        );

        let err = Pipeline::new(Arc::new(store.clone()), engine, staging)
            .run()
            .await
            .expect_err("staging fails");

        assert!(matches!(err, PipelineError::Staging { .. }));
        assert_eq!(store.listings(), 0);
    }
}
