//! Shared client utilities, error types, and telemetry wiring for the CLI.

use std::fmt::{self, Display, Formatter};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::anyhow;
use redeemer_config::{ConfigError, ResolverChain};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Url};
use serde::Serialize;

use crate::cli::Cli;

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";
pub(crate) const TELEMETRY_ENDPOINT_ENV: &str = "REDEEMER_TELEMETRY_ENDPOINT";

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::MissingField { hint, .. } => {
                Self::validation(format!("{err} ({hint})"))
            }
            ConfigError::InvalidField { .. } | ConfigError::ProfileParse { .. } => {
                Self::validation(format!("{:#}", anyhow::Error::new(err)))
            }
            other => Self::failure(other),
        }
    }
}

/// Dependencies constructed from environment flags and CLI options.
pub(crate) struct CliDependencies {
    pub(crate) client: Client,
    pub(crate) resolver: ResolverChain,
    pub(crate) telemetry: Option<TelemetryEmitter>,
}

impl CliDependencies {
    /// Construct a configured HTTP client, the default connection resolvers,
    /// and an optional telemetry emitter.
    pub(crate) fn from_env(cli: &Cli, trace_id: &str) -> CliResult<Self> {
        let mut default_headers = HeaderMap::new();
        let request_id = HeaderValue::from_str(trace_id).map_err(|_| {
            CliError::failure(anyhow!("trace identifier contains invalid characters"))
        })?;
        default_headers.insert(HEADER_REQUEST_ID, request_id);

        let client = Client::builder()
            .timeout(Duration::from_secs(cli.http_timeout_secs))
            .default_headers(default_headers)
            .build()
            .map_err(|err| CliError::failure(anyhow!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            resolver: ResolverChain::default(),
            telemetry: TelemetryEmitter::from_env(),
        })
    }
}

/// Telemetry emitter used to forward run outcomes.
#[derive(Clone)]
pub(crate) struct TelemetryEmitter {
    pub(crate) client: Client,
    pub(crate) endpoint: Url,
}

impl TelemetryEmitter {
    #[must_use]
    pub(crate) fn from_env() -> Option<Self> {
        let endpoint = std::env::var(TELEMETRY_ENDPOINT_ENV).ok()?;
        let endpoint = endpoint.parse().ok()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .ok()?;
        Some(Self { client, endpoint })
    }

    pub(crate) async fn emit(&self, event: &TelemetryEvent<'_>) {
        if let Err(err) = self
            .client
            .post(self.endpoint.clone())
            .json(event)
            .send()
            .await
        {
            tracing::debug!(error = %err, "telemetry emit failed");
        }
    }
}

/// Outcome of one CLI invocation.
#[derive(Debug, Serialize)]
pub(crate) struct TelemetryEvent<'a> {
    pub(crate) command: &'a str,
    pub(crate) outcome: &'a str,
    pub(crate) trace_id: &'a str,
    pub(crate) exit_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) message: Option<&'a str>,
    pub(crate) replayed: usize,
    pub(crate) timestamp_ms: u64,
}

/// Millisecond timestamp helper for telemetry.
#[must_use]
pub(crate) fn timestamp_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
