//! # Solidrock Connector
//!
//! Contract between the sync engine and the remote Solidrock API.
//!
//! The remote API exposes two collections, each with a listing endpoint that
//! returns every live record and a detail endpoint that returns one full
//! nested document:
//!
//! - [`Collection::Churches`] - church gatherings
//! - [`Collection::Jobs`] - open job postings
//!
//! ## Crate Organization
//!
//! - [`types`] - `Collection`, `RemoteRecordSummary`, timestamp parsing
//! - [`record`] - typed detail documents (`GatheringRecord`, `JobRecord`)
//! - [`error`] - error type with transient/permanent classification
//! - [`traits`] - the `RemoteSource` capability trait
//!
//! ## Example
//!
//! ```ignore
//! use solidrock_connector::prelude::*;
//!
//! let summaries = source.list_all(Collection::Churches).await?;
//! for summary in &summaries {
//!     if let Some(RemoteRecordDetail::Gathering(record)) =
//!         source.fetch_one(Collection::Churches, &summary.id).await?
//!     {
//!         println!("{:?}", record.gathering);
//!     }
//! }
//! ```

pub mod error;
pub mod record;
pub mod traits;
pub mod types;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{ConnectorError, ConnectorResult};
    pub use crate::record::{
        Address, Gathering, GatheringRecord, Image, Images, Job, JobCategoryRef, JobRecord,
        RemoteRecordDetail, Service, Social,
    };
    pub use crate::traits::RemoteSource;
    pub use crate::types::{parse_remote_timestamp, Collection, RemoteRecordSummary};
}

// Re-export async_trait for source implementors
pub use async_trait::async_trait;
