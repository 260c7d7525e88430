#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(
    missing_docs,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::redundant_pub_crate)]

//! Object store access for previously persisted request payloads.
//!
//! Layout:
//! - `object.rs`: the `ObjectStore` seam and `RemoteObjectRef`
//! - `connection.rs`: connection string parsing into an endpoint + credential
//! - `auth.rs`: Shared Key / SAS request authorisation
//! - `listing.rs`: `EnumerationResults` page parsing
//! - `azure.rs`: the Azure Blob REST implementation

mod auth;
pub mod azure;
mod connection;
pub mod error;
mod listing;
pub mod object;

pub use azure::AzureBlobStore;
pub use error::{StoreError, StoreResult};
pub use object::{ObjectStore, ObjectStream, RemoteObjectRef};
