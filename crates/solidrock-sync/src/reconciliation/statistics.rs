//! Run statistics for a sync run.

use serde::{Deserialize, Serialize};

use super::plan::ReconciliationPlan;
use super::reconciler::{Decision, SyncAction};
use crate::dispatch::DispatchReport;

/// Counters collected while a sync run executes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatistics {
    /// Records in the remote listing.
    #[serde(default)]
    pub remote_total: u32,
    /// Entries in the local section.
    #[serde(default)]
    pub local_total: u32,
    /// Remote keys with no local counterpart.
    #[serde(default)]
    pub missing: u32,
    /// Remote keys also present locally.
    #[serde(default)]
    pub updating: u32,
    /// Local keys absent remotely.
    #[serde(default)]
    pub removed: u32,
    #[serde(default)]
    pub creates: u32,
    #[serde(default)]
    pub updates: u32,
    /// Matched records held back by the update policy.
    #[serde(default)]
    pub updates_skipped: u32,
    #[serde(default)]
    pub disables: u32,
    /// Local entries sharing an identity key with a lower-id entry.
    #[serde(default)]
    pub duplicate_keys: u32,
    /// Work items newly queued.
    #[serde(default)]
    pub enqueued: u32,
    /// Work items already queued by an earlier run.
    #[serde(default)]
    pub already_queued: u32,
    /// Work items the queue refused.
    #[serde(default)]
    pub enqueue_failures: u32,
    /// Total duration in milliseconds.
    #[serde(default)]
    pub duration_ms: u64,
}

impl RunStatistics {
    /// Create new empty statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record list sizes and plan partition sizes.
    pub fn record_plan(&mut self, remote_total: usize, local_total: usize, plan: &ReconciliationPlan) {
        self.remote_total = saturate(remote_total);
        self.local_total = saturate(local_total);
        self.missing = saturate(plan.missing.len());
        self.updating = saturate(plan.updating.len());
        self.removed = saturate(plan.removed.len());
    }

    /// Record the decided actions.
    pub fn record_decision(&mut self, decision: &Decision) {
        for action in &decision.actions {
            match action {
                SyncAction::Create { .. } => self.creates += 1,
                SyncAction::Update { .. } => self.updates += 1,
                SyncAction::Disable { .. } => self.disables += 1,
            }
        }
        self.updates_skipped = decision.updates_skipped;
        self.duplicate_keys = decision.duplicates;
    }

    /// Record the dispatch outcome.
    pub fn record_dispatch(&mut self, report: &DispatchReport) {
        self.enqueued = report.enqueued;
        self.already_queued = report.duplicates;
        self.enqueue_failures = report.failed;
    }

    /// Total actions decided.
    #[must_use]
    pub fn actions_total(&self) -> u32 {
        self.creates + self.updates + self.disables
    }
}

fn saturate(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
