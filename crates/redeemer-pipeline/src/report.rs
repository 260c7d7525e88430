//! Ordered record of what happened to each staged file.

use std::path::{Path, PathBuf};

use serde::Serialize;

/// Result of replaying one staged file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayOutcome {
    /// Staged file that was submitted.
    #[serde(rename = "file")]
    pub source_file: PathBuf,
    /// Downstream HTTP status, kept verbatim as text.
    pub status_code: String,
}

impl ReplayOutcome {
    /// Outcome for `source_file` answered with `status`.
    #[must_use]
    pub fn new(source_file: &Path, status: u16) -> Self {
        Self {
            source_file: source_file.to_path_buf(),
            status_code: status.to_string(),
        }
    }
}

/// Object left out of the run because its download failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadGap {
    object: String,
    reason: String,
}

impl DownloadGap {
    /// Gap for `object`, describing `error` and its sources.
    #[must_use]
    pub fn new(object: &str, error: &(dyn std::error::Error + 'static)) -> Self {
        let mut reason = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            reason.push_str(": ");
            reason.push_str(&cause.to_string());
            source = cause.source();
        }
        Self {
            object: object.to_string(),
            reason,
        }
    }

    /// Name of the skipped object.
    #[must_use]
    pub fn object(&self) -> &str {
        &self.object
    }

    /// Human-readable failure description.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Final report of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    outcomes: Vec<ReplayOutcome>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    gaps: Vec<DownloadGap>,
}

impl ReplayReport {
    /// Outcomes in submission order.
    #[must_use]
    pub fn outcomes(&self) -> &[ReplayOutcome] {
        &self.outcomes
    }

    /// Objects skipped during the download phase.
    #[must_use]
    pub fn gaps(&self) -> &[DownloadGap] {
        &self.gaps
    }

    /// Number of files submitted.
    #[must_use]
    pub fn replayed(&self) -> usize {
        self.outcomes.len()
    }
}

/// Append-only accumulator; entries keep insertion order.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    report: ReplayReport,
}

impl ReportBuilder {
    /// Empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one replay outcome.
    pub fn record(&mut self, outcome: ReplayOutcome) {
        self.report.outcomes.push(outcome);
    }

    /// Append one skipped object.
    pub fn record_gap(&mut self, gap: DownloadGap) {
        self.report.gaps.push(gap);
    }

    /// Outcomes recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.report.outcomes.len()
    }

    /// Whether nothing has been replayed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.report.outcomes.is_empty()
    }

    /// Finished report.
    #[must_use]
    pub fn finish(self) -> ReplayReport {
        self.report
    }
}
