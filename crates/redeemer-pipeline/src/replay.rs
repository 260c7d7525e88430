//! Replay phase: submit staged files one at a time, paced.
//!
//! # Design
//! - Submissions never overlap; the next file is read only after the previous
//!   response has been fully received.
//! - The pacing delay separates consecutive submissions and is never applied
//!   after the last one.
//! - Any status code is an outcome. Only failures to complete the exchange
//!   abort the run.
//! - Staged content that is not valid UTF-8 is decoded lossily and still
//!   submitted.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redeemer_config::defaults::SUBSCRIPTION_KEY_HEADER;
use redeemer_config::{ApiKey, BodyEncoding, ReplaySettings};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{PipelineError, PipelineResult};
use crate::report::{ReplayOutcome, ReportBuilder};
use crate::staging::StagedFile;

/// Boxed error used by [`Submitter`] implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure to complete one request/response exchange.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be sent or no response arrived.
    #[error("request could not be completed")]
    Send {
        /// Underlying client error.
        source: BoxError,
    },
    /// The response body could not be read to the end.
    #[error("response body could not be read")]
    ResponseBody {
        /// Underlying client error.
        source: BoxError,
    },
}

/// What the downstream service answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body text.
    pub body: String,
}

/// Sends one prepared request body downstream.
#[async_trait]
pub trait Submitter: Send + Sync {
    /// Submit `body` and wait for the complete response.
    async fn submit(&self, body: String) -> Result<SubmitResponse, TransportError>;
}

/// [`Submitter`] posting JSON to the redemption endpoint.
#[derive(Clone)]
pub struct HttpSubmitter {
    client: Client,
    url: Url,
    api_key: ApiKey,
}

impl HttpSubmitter {
    /// Submitter for `url`, authenticating with `api_key`.
    #[must_use]
    pub const fn new(client: Client, url: Url, api_key: ApiKey) -> Self {
        Self {
            client,
            url,
            api_key,
        }
    }

    /// Submitter for the endpoint and key in `settings`.
    #[must_use]
    pub fn from_settings(client: Client, settings: &ReplaySettings) -> Self {
        Self::new(client, settings.api_url.clone(), settings.api_key.clone())
    }
}

#[async_trait]
impl Submitter for HttpSubmitter {
    async fn submit(&self, body: String) -> Result<SubmitResponse, TransportError> {
        let response = self
            .client
            .post(self.url.clone())
            .header(SUBSCRIPTION_KEY_HEADER, self.api_key.expose())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|source| TransportError::Send {
                source: Box::new(source.without_url()),
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|source| TransportError::ResponseBody {
                source: Box::new(source.without_url()),
            })?;
        debug!(status, body = %body, "downstream response");
        Ok(SubmitResponse { status, body })
    }
}

/// Prepare the request body for staged `text`.
#[must_use]
pub fn encode_body(text: &str, encoding: BodyEncoding) -> String {
    match encoding {
        BodyEncoding::JsonString => serde_json::Value::String(text.to_owned()).to_string(),
        BodyEncoding::Raw => text.to_owned(),
    }
}

/// Replays staged files in order through a [`Submitter`].
#[derive(Clone)]
pub struct ReplayEngine {
    submitter: Arc<dyn Submitter>,
    pacing: Duration,
    encoding: BodyEncoding,
}

impl ReplayEngine {
    /// Engine waiting `pacing` between submissions.
    #[must_use]
    pub fn new(submitter: Arc<dyn Submitter>, pacing: Duration, encoding: BodyEncoding) -> Self {
        Self {
            submitter,
            pacing,
            encoding,
        }
    }

    /// Engine using the pacing and encoding from `settings`.
    #[must_use]
    pub fn from_settings(submitter: Arc<dyn Submitter>, settings: &ReplaySettings) -> Self {
        Self::new(submitter, settings.pacing, settings.body_encoding)
    }

    /// Submit every file in order, appending one outcome per file.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::StagedRead`] when a file cannot be read and
    /// [`PipelineError::Transport`] when an exchange does not complete. Outcomes
    /// recorded before the failure stay in `report`.
    pub async fn replay_all(
        &self,
        files: &[StagedFile],
        report: &mut ReportBuilder,
    ) -> PipelineResult<()> {
        for (index, file) in files.iter().enumerate() {
            if index > 0 && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }
            let outcome = self.replay_one(file).await?;
            report.record(outcome);
        }
        Ok(())
    }

    async fn replay_one(&self, file: &StagedFile) -> PipelineResult<ReplayOutcome> {
        let bytes = tokio::fs::read(file.path())
            .await
            .map_err(|source| PipelineError::StagedRead {
                path: file.path().to_path_buf(),
                source,
            })?;
        let text = String::from_utf8(bytes).unwrap_or_else(|err| {
            warn!(
                file = %file.path().display(),
                valid_up_to = err.utf8_error().valid_up_to(),
                "staged file is not valid UTF-8; replacing invalid bytes"
            );
            String::from_utf8_lossy(err.as_bytes()).into_owned()
        });
        let body = encode_body(&text, self.encoding);

        let started = Instant::now();
        let response =
            self.submitter
                .submit(body)
                .await
                .map_err(|source| PipelineError::Transport {
                    path: file.path().to_path_buf(),
                    source,
                })?;
        info!(
            file = %file.path().display(),
            status = response.status,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "replayed staged file"
        );
        Ok(ReplayOutcome::new(file.path(), response.status))
    }
}
