//! # Solidrock Sync
//!
//! Keeps local church and job entries in line with the remote Solidrock API.
//!
//! This crate provides:
//! - Three-way reconciliation of remote identity keys against local entries
//! - Per-collection update policies gated on remote timestamps
//! - Field mapping of gathering and job documents into flat field sets
//! - A deduplicating work queue with time-budgeted, retried execution
//! - Per-collection run locks so overlapping runs fail fast
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────┐     ┌───────────────┐
//! │  RemoteSource   │────►│  SyncEngine  │◄────│  LocalStore   │
//! │  (list_all)     │     │  plan/decide │     │ (list_entries)│
//! └─────────────────┘     └──────┬───────┘     └───────▲───────┘
//!                                │                     │
//!                                ▼                     │
//!                         ┌──────────────┐     ┌───────┴───────┐
//!                         │ WorkDispatch │────►│  SyncWorker   │
//!                         │  + WorkQueue │     │  + Executor   │
//!                         └──────────────┘     └───────┬───────┘
//!                                                      │
//!                         ┌──────────────┐             │
//!                         │ FieldMapper  │◄────────────┘
//!                         │ (fetch_one)  │
//!                         └──────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use solidrock_sync::prelude::*;
//!
//! let service = SolidrockSync::new(settings, remote, store, queue);
//! let status = service.sync_now(Collection::Churches).await;
//! service.worker(WorkerConfig::default()).drain().await?;
//! ```

pub mod dispatch;
pub mod error;
pub mod executor;
pub mod fields;
pub mod ids;
pub mod lock;
pub mod mapper;
pub mod queue;
pub mod reconciliation;
pub mod service;
pub mod settings;
pub mod store;
pub mod worker;

pub use dispatch::{DispatchReport, WorkDispatcher, WorkItem};
pub use error::{SyncError, SyncResult};
pub use executor::{WorkExecutor, WorkOutcome};
pub use queue::{EnqueueOutcome, MemoryQueue, QueueError, QueuedWork, WorkQueue};
pub use reconciliation::{
    ReconciliationPlan, Reconciler, RunStatistics, RunSummary, SyncAction, SyncEngine,
    UpdatePolicy,
};
pub use service::SolidrockSync;
pub use settings::{Settings, SyncOptions};
pub use store::{LocalEntry, LocalStore, MemoryStore, StoreError};
pub use worker::{DrainReport, SyncWorker, WorkerConfig};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::dispatch::WorkItem;
    pub use crate::error::{SyncError, SyncResult};
    pub use crate::fields::{FieldSet, FieldValue, MappedEntry};
    pub use crate::ids::{CategoryGroupId, EntryId, EntryTypeId, SectionId};
    pub use crate::queue::{MemoryQueue, WorkQueue};
    pub use crate::reconciliation::UpdatePolicy;
    pub use crate::service::SolidrockSync;
    pub use crate::settings::{Settings, SyncOptions};
    pub use crate::store::{LocalStore, MemoryStore};
    pub use crate::worker::{SyncWorker, WorkerConfig};
    pub use solidrock_connector::types::Collection;
}
