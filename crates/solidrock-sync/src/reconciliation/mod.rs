//! # Reconciliation
//!
//! Compares the remote listing of a collection with the local entries of its
//! section and turns the difference into queued work.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                           SyncEngine                             │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  RemoteSource::list_all ──┐                                      │
//! │                           ▼                                      │
//! │                  ┌─────────────────┐    ┌─────────────────┐      │
//! │                  │ Reconciliation  │───►│   Reconciler    │      │
//! │                  │      Plan       │    │ (UpdatePolicy)  │      │
//! │                  └─────────────────┘    └─────────────────┘      │
//! │                           ▲                      │               │
//! │  LocalStore::list_entries ┘                      ▼               │
//! │                                         ┌─────────────────┐      │
//! │                                         │ WorkDispatcher  │      │
//! │                                         └─────────────────┘      │
//! │                                                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The plan is pure; the engine only reads the store and writes to the
//! queue. Store writes happen later in the executor.

mod engine;
mod plan;
mod policy;
mod reconciler;
mod statistics;

pub use engine::{RunSummary, SyncEngine};
pub use plan::ReconciliationPlan;
pub use policy::UpdatePolicy;
pub use reconciler::{Decision, Reconciler, SyncAction};
pub use statistics::RunStatistics;
