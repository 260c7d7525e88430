//! Output renderers for the replay report.

use std::io::Write;

use anyhow::anyhow;
use redeemer_pipeline::ReplayReport;

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

const FILE_HEADER: &str = "file";
const STATUS_HEADER: &str = "statusCode";

pub(crate) fn render_report(
    report: &ReplayReport,
    format: OutputFormat,
    out: &mut impl Write,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            let text = serde_json::to_string_pretty(report)
                .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
            writeln!(out, "{text}").map_err(write_failed)?;
        }
        OutputFormat::Table => render_table(report, out).map_err(write_failed)?,
    }
    Ok(())
}

fn render_table(report: &ReplayReport, out: &mut impl Write) -> std::io::Result<()> {
    let rows: Vec<(String, &str)> = report
        .outcomes()
        .iter()
        .map(|outcome| {
            (
                outcome.source_file.display().to_string(),
                outcome.status_code.as_str(),
            )
        })
        .collect();
    let width = rows
        .iter()
        .map(|(file, _)| file.chars().count())
        .max()
        .unwrap_or(0)
        .max(FILE_HEADER.len());

    writeln!(out, "{FILE_HEADER:<width$}  {STATUS_HEADER}")?;
    for (file, status) in &rows {
        writeln!(out, "{file:<width$}  {status}")?;
    }
    for gap in report.gaps() {
        writeln!(out, "skipped: {} ({})", gap.object(), gap.reason())?;
    }
    Ok(())
}

fn write_failed(err: std::io::Error) -> CliError {
    CliError::failure(anyhow!("failed to write report: {err}"))
}
