//! Argument parsing, logging setup, and command dispatch.

use std::io;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use redeemer_config::defaults::{
    DEFAULT_API_URL, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_PACING_MS, DEFAULT_TMP_DIR,
};
use redeemer_config::{BodyEncoding, DownloadFailurePolicy};
use redeemer_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, init_logging};
use tracing::Instrument;
use uuid::Uuid;

use crate::client::{CliDependencies, CliResult, TelemetryEvent, timestamp_now_ms};
use crate::commands::redeem::handle_redeem_bonuses;
use crate::output::render_report;

/// Parses CLI arguments, executes the requested command, and handles
/// user-facing telemetry emission. Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let logging = LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format.map_or_else(LogFormat::infer, LogFormat::from),
    };
    if let Err(err) = init_logging(&logging) {
        eprintln!("warning: {err}");
    }

    let command_name = command_label(&cli.command);
    let trace_id = Uuid::new_v4().to_string();
    let deps = match CliDependencies::from_env(&cli, &trace_id) {
        Ok(deps) => deps,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            return err.exit_code();
        }
    };

    let span = tracing::info_span!("redeem", trace_id = %trace_id, command = command_name);
    let result = dispatch(cli, &deps).instrument(span).await;

    let (exit_code, message, outcome, replayed) = match result {
        Ok(replayed) => (0, None, "success", replayed),
        Err(err) => {
            let exit_code = err.exit_code();
            let message = err.display_message();
            eprintln!("error: {message}");
            (exit_code, Some(message), "error", 0)
        }
    };

    if let Some(emitter) = &deps.telemetry {
        emitter
            .emit(&TelemetryEvent {
                command: command_name,
                outcome,
                trace_id: &trace_id,
                exit_code,
                message: message.as_deref(),
                replayed,
                timestamp_ms: timestamp_now_ms(),
            })
            .await;
    }

    exit_code
}

/// Run the selected command and render its report; returns the number of
/// replayed files.
async fn dispatch(cli: Cli, deps: &CliDependencies) -> CliResult<usize> {
    match cli.command {
        Command::RedeemBonuses(args) => {
            let report = handle_redeem_bonuses(deps, args).await?;
            render_report(&report, cli.output, &mut io::stdout().lock())?;
            Ok(report.replayed())
        }
    }
}

#[derive(Parser)]
#[command(
    name = "redeemer",
    version,
    about = "Replays persisted bonus redemption requests against the redemption API"
)]
pub(crate) struct Cli {
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for the replay report"
    )]
    pub(crate) output: OutputFormat,
    #[arg(
        long,
        global = true,
        env = "REDEEMER_HTTP_TIMEOUT_SECS",
        default_value_t = DEFAULT_HTTP_TIMEOUT_SECS,
        help = "Per-request timeout for storage and API calls"
    )]
    pub(crate) http_timeout_secs: u64,
    #[arg(long, global = true, default_value = DEFAULT_LOG_LEVEL)]
    pub(crate) log_level: String,
    #[arg(long, global = true, value_enum)]
    pub(crate) log_format: Option<LogFormatArg>,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Download every persisted request under a folder and replay it.
    RedeemBonuses(RedeemBonusesArgs),
}

#[derive(Args)]
pub(crate) struct RedeemBonusesArgs {
    #[arg(
        short = 'o',
        long,
        default_value = DEFAULT_TMP_DIR,
        help = "Local base directory for staged files"
    )]
    pub(crate) tmp_dir: PathBuf,
    #[arg(
        short = 'c',
        long,
        help = "Folder prefix selecting which stored requests to replay"
    )]
    pub(crate) container_folder: String,
    #[arg(
        short = 'u',
        long,
        default_value = DEFAULT_API_URL,
        help = "Redemption endpoint receiving each request"
    )]
    pub(crate) api_url: String,
    #[arg(
        short = 'k',
        long,
        env = "REDEEMER_API_KEY",
        hide_env_values = true,
        help = "Subscription key for the redemption endpoint"
    )]
    pub(crate) api_key: String,
    #[arg(long, default_value_t = DEFAULT_PACING_MS, help = "Delay between submissions")]
    pub(crate) pacing_ms: u64,
    #[arg(long, value_enum, default_value_t = DownloadErrorArg::Abort)]
    pub(crate) on_download_error: DownloadErrorArg,
    #[arg(long, value_enum, default_value_t = BodyEncodingArg::JsonString)]
    pub(crate) body_encoding: BodyEncodingArg,
    #[arg(long, env = "REDEEMER_STORAGE_ACCOUNT")]
    pub(crate) storage_account: Option<String>,
    #[arg(long, env = "REDEEMER_REDEEMED_CONTAINER")]
    pub(crate) container: Option<String>,
    #[arg(long, help = "JSON file with account_name and container")]
    pub(crate) profile: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Pretty => Self::Pretty,
            LogFormatArg::Json => Self::Json,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum DownloadErrorArg {
    Abort,
    Skip,
}

impl From<DownloadErrorArg> for DownloadFailurePolicy {
    fn from(value: DownloadErrorArg) -> Self {
        match value {
            DownloadErrorArg::Abort => Self::Abort,
            DownloadErrorArg::Skip => Self::Skip,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum BodyEncodingArg {
    JsonString,
    Raw,
}

impl From<BodyEncodingArg> for BodyEncoding {
    fn from(value: BodyEncodingArg) -> Self {
        match value {
            BodyEncodingArg::JsonString => Self::JsonString,
            BodyEncodingArg::Raw => Self::Raw,
        }
    }
}

const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::RedeemBonuses(_) => "redeem-bonuses",
    }
}
