#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(
    missing_docs,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]

//! Download → replay → report pipeline for persisted redemption requests.
//!
//! Layout:
//! - `staging.rs`: local staging area and staged file handles
//! - `fetch.rs`: lists remote objects and materialises them locally
//! - `replay.rs`: paced, strictly sequential submission to the downstream API
//! - `report.rs`: ordered per-item outcomes
//! - `orchestrator.rs`: phase sequencing and fatal-error handling

pub mod error;
pub mod fetch;
pub mod orchestrator;
pub mod replay;
pub mod report;
pub mod staging;

pub use error::{PipelineError, PipelineResult};
pub use fetch::{FetchOutcome, Fetcher};
pub use orchestrator::Pipeline;
pub use replay::{
    BoxError, HttpSubmitter, ReplayEngine, SubmitResponse, Submitter, TransportError, encode_body,
};
pub use report::{DownloadGap, ReplayOutcome, ReplayReport, ReportBuilder};
pub use staging::{StagedFile, StagingArea};
