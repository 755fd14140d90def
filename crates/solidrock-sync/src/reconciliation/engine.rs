//! Sync run orchestration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use solidrock_connector::traits::RemoteSource;
use solidrock_connector::types::Collection;

use super::plan::ReconciliationPlan;
use super::reconciler::Reconciler;
use super::statistics::RunStatistics;
use crate::dispatch::WorkDispatcher;
use crate::error::{SyncError, SyncResult};
use crate::lock::RunLocks;
use crate::settings::{Settings, SyncOptions};
use crate::store::LocalStore;

/// Result of one completed sync run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub collection: Collection,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub plan: ReconciliationPlan,
    pub statistics: RunStatistics,
}

/// Computes the plan of a collection and dispatches its work items.
///
/// The engine never writes to the local store itself.
#[derive(Clone)]
pub struct SyncEngine {
    settings: Arc<Settings>,
    options: SyncOptions,
    remote: Arc<dyn RemoteSource>,
    store: Arc<dyn LocalStore>,
    dispatcher: WorkDispatcher,
    locks: RunLocks,
}

impl SyncEngine {
    /// Create an engine.
    pub fn new(
        settings: Arc<Settings>,
        options: SyncOptions,
        remote: Arc<dyn RemoteSource>,
        store: Arc<dyn LocalStore>,
        dispatcher: WorkDispatcher,
        locks: RunLocks,
    ) -> Self {
        Self {
            settings,
            options,
            remote,
            store,
            dispatcher,
            locks,
        }
    }

    /// Options in effect.
    #[must_use]
    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Run one reconciliation of a collection.
    ///
    /// Fails before any network call when settings are incomplete, and fails
    /// fast when another run of the same collection holds the lock. An empty
    /// or failed remote listing ends the run without dispatching anything.
    #[instrument(skip(self), fields(collection = %collection))]
    pub async fn run(&self, collection: Collection) -> SyncResult<RunSummary> {
        self.settings.validate()?;
        let target = self.settings.target(collection)?;

        let _guard = self.locks.try_acquire(collection)?;

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let clock = Instant::now();
        info!(run_id = %run_id, source = %self.remote.display_name(), "Starting sync run");

        let remote = self.remote.list_all(collection).await.map_err(|e| {
            error!(run_id = %run_id, error = %e, "Failed to list remote records");
            SyncError::from(e)
        })?;

        if remote.is_empty() {
            warn!(run_id = %run_id, "Remote listing is empty, skipping run");
            return Err(SyncError::NoRemoteData { collection });
        }

        let local = self
            .store
            .list_entries(target.section, collection.identity_field())
            .await?;

        let plan = ReconciliationPlan::compute(
            remote.iter().map(|s| s.id.as_str()),
            local.iter().map(|e| e.identity_key.as_str()),
        );

        let policy = self.options.policy_for(collection);
        let decision = Reconciler::decide(collection, &plan, &remote, &local, policy);

        let mut statistics = RunStatistics::new();
        statistics.record_plan(remote.len(), local.len(), &plan);
        statistics.record_decision(&decision);

        info!(
            run_id = %run_id,
            remote_total = statistics.remote_total,
            local_total = statistics.local_total,
            missing = statistics.missing,
            updating = statistics.updating,
            removed = statistics.removed,
            policy = %policy,
            "Computed reconciliation plan"
        );

        let report = self.dispatcher.dispatch(collection, &decision.actions).await;
        statistics.record_dispatch(&report);
        statistics.duration_ms = u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX);

        info!(
            run_id = %run_id,
            creates = statistics.creates,
            updates = statistics.updates,
            updates_skipped = statistics.updates_skipped,
            disables = statistics.disables,
            enqueued = statistics.enqueued,
            enqueue_failures = statistics.enqueue_failures,
            duration_ms = statistics.duration_ms,
            "Sync run completed"
        );

        Ok(RunSummary {
            run_id,
            collection,
            started_at,
            completed_at: Utc::now(),
            plan,
            statistics,
        })
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("settings", &self.settings)
            .field("options", &self.options)
            .field("remote", &self.remote.display_name())
            .finish_non_exhaustive()
    }
}
