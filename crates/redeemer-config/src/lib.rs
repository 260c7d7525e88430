#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(
    missing_docs,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]

//! Configuration for the bonus redemption reprocessing pipeline.
//!
//! Layout: `model.rs` (typed settings and policy switches), `validate.rs`
//! (parsing/validation helpers), `resolve.rs` (storage account and connection
//! string resolution), `defaults.rs` (shared defaults).

pub mod defaults;
pub mod error;
pub mod model;
pub mod resolve;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use model::{
    ApiKey, BodyEncoding, DownloadFailurePolicy, ReplaySettings, StagingSettings, StorageConnection,
    StorageProfile,
};
pub use resolve::{
    AzCliConnectionResolver, ConnectionResolver, EnvConnectionResolver, ResolverChain,
};
