//! Work items and their dispatch onto the queue.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use solidrock_connector::types::Collection;

use crate::ids::EntryId;
use crate::queue::{EnqueueOutcome, WorkQueue};
use crate::reconciliation::SyncAction;

/// A deferred unit of work executed by the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkItem {
    /// Fetch a remote record and create a local entry for it.
    Create {
        collection: Collection,
        remote_id: String,
    },
    /// Fetch a remote record and rewrite its local entry.
    Update {
        collection: Collection,
        remote_id: String,
        entry_id: EntryId,
    },
    /// Disable a local entry.
    Disable {
        collection: Collection,
        entry_id: EntryId,
    },
    /// Queue an [`WorkItem::Update`] for every keyed local entry of a
    /// collection.
    UpdateAll { collection: Collection },
}

impl WorkItem {
    /// Build the work item for a decided action.
    #[must_use]
    pub fn from_action(collection: Collection, action: &SyncAction) -> Self {
        match action {
            SyncAction::Create { remote_id } => WorkItem::Create {
                collection,
                remote_id: remote_id.clone(),
            },
            SyncAction::Update {
                remote_id,
                entry_id,
            } => WorkItem::Update {
                collection,
                remote_id: remote_id.clone(),
                entry_id: *entry_id,
            },
            SyncAction::Disable { entry_id } => WorkItem::Disable {
                collection,
                entry_id: *entry_id,
            },
        }
    }

    /// Collection the item belongs to.
    #[must_use]
    pub fn collection(&self) -> Collection {
        match self {
            WorkItem::Create { collection, .. }
            | WorkItem::Update { collection, .. }
            | WorkItem::Disable { collection, .. }
            | WorkItem::UpdateAll { collection } => *collection,
        }
    }

    /// Item type name.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            WorkItem::Create { .. } => "create",
            WorkItem::Update { .. } => "update",
            WorkItem::Disable { .. } => "disable",
            WorkItem::UpdateAll { .. } => "update_all",
        }
    }

    /// Deterministic key identifying the item's intent.
    ///
    /// SHA-256 over `collection:kind:target`, hex encoded.
    #[must_use]
    pub fn idempotency_key(&self) -> String {
        let target = match self {
            WorkItem::Create { remote_id, .. } => remote_id.clone(),
            WorkItem::Update {
                remote_id,
                entry_id,
                ..
            } => format!("{remote_id}:{entry_id}"),
            WorkItem::Disable { entry_id, .. } => entry_id.to_string(),
            WorkItem::UpdateAll { .. } => "all".to_string(),
        };
        let composite = format!("{}:{}:{target}", self.collection(), self.kind());

        let mut hasher = Sha256::new();
        hasher.update(composite.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Human-readable description shown in queue listings.
    #[must_use]
    pub fn description(&self) -> String {
        let label = self.collection().record_label();
        match self {
            WorkItem::Create { remote_id, .. } => format!("Creating Solidrock {label}: {remote_id}"),
            WorkItem::Update { remote_id, .. } => format!("Updating Solidrock {label}: {remote_id}"),
            WorkItem::Disable { entry_id, .. } => {
                format!("Disabling Solidrock {label} entry: {entry_id}")
            }
            WorkItem::UpdateAll { .. } => format!("Update local Solidrock {label} data"),
        }
    }
}

/// Counts of one dispatch call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    /// Newly queued items.
    pub enqueued: u32,
    /// Items already pending or in flight.
    pub duplicates: u32,
    /// Items the queue refused.
    pub failed: u32,
}

/// Enqueues work items with the configured time budget.
#[derive(Clone)]
pub struct WorkDispatcher {
    queue: Arc<dyn WorkQueue>,
    time_budget: Duration,
}

impl WorkDispatcher {
    /// Create a dispatcher.
    pub fn new(queue: Arc<dyn WorkQueue>, time_budget: Duration) -> Self {
        Self { queue, time_budget }
    }

    /// Time budget attached to every item.
    #[must_use]
    pub fn time_budget(&self) -> Duration {
        self.time_budget
    }

    /// Enqueue one work item.
    pub async fn submit(&self, item: WorkItem) -> crate::queue::QueueResult<EnqueueOutcome> {
        self.queue.enqueue(item, self.time_budget).await
    }

    /// Enqueue one work item per action.
    ///
    /// A failed enqueue is logged and counted; the rest of the batch still
    /// goes out.
    pub async fn dispatch(&self, collection: Collection, actions: &[SyncAction]) -> DispatchReport {
        let items = actions
            .iter()
            .map(|action| WorkItem::from_action(collection, action))
            .collect::<Vec<_>>();
        let report = self.submit_all(items).await;

        info!(
            collection = %collection,
            enqueued = report.enqueued,
            duplicates = report.duplicates,
            failed = report.failed,
            "Dispatched sync actions"
        );
        report
    }

    /// Enqueue a batch of work items, counting the result of each.
    pub async fn submit_all<I>(&self, items: I) -> DispatchReport
    where
        I: IntoIterator<Item = WorkItem>,
    {
        let mut report = DispatchReport::default();

        for item in items {
            let collection = item.collection();
            let description = item.description();
            match self.submit(item).await {
                Ok(EnqueueOutcome::Enqueued(id)) => {
                    debug!(work_id = %id, description = %description, "Dispatched work");
                    report.enqueued += 1;
                }
                Ok(EnqueueOutcome::Duplicate(id)) => {
                    debug!(work_id = %id, description = %description, "Work already queued");
                    report.duplicates += 1;
                }
                Err(e) => {
                    error!(
                        collection = %collection,
                        description = %description,
                        error = %e,
                        "Failed to enqueue work"
                    );
                    report.failed += 1;
                }
            }
        }

        report
    }
}

impl std::fmt::Debug for WorkDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkDispatcher")
            .field("time_budget", &self.time_budget)
            .finish_non_exhaustive()
    }
}
