//! Trigger-facing service.
//!
//! [`SolidrockSync`] wires settings, the remote source, the local store and
//! the work queue together and exposes the two triggers: an immediate sync of
//! a collection and a scheduled update of every existing entry.

use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use solidrock_connector::traits::RemoteSource;
use solidrock_connector::types::Collection;

use crate::dispatch::{WorkDispatcher, WorkItem};
use crate::error::SyncResult;
use crate::executor::WorkExecutor;
use crate::lock::RunLocks;
use crate::queue::{EnqueueOutcome, WorkQueue};
use crate::reconciliation::{RunSummary, SyncEngine};
use crate::settings::{Settings, SyncOptions};
use crate::store::LocalStore;
use crate::worker::{SyncWorker, WorkerConfig};

/// Status returned by [`SolidrockSync::sync_now`].
#[must_use]
pub fn sync_status(collection: Collection) -> &'static str {
    match collection {
        Collection::Churches => "Syncing remote Solidrock gathering data",
        Collection::Jobs => "Syncing remote Solidrock jobs data",
    }
}

/// Status returned by [`SolidrockSync::schedule_update`].
#[must_use]
pub fn update_status(collection: Collection) -> &'static str {
    match collection {
        Collection::Churches => "Updating local Solidrock gathering data",
        Collection::Jobs => "Updating local Solidrock jobs data",
    }
}

/// Sync service.
pub struct SolidrockSync {
    settings: Arc<Settings>,
    remote: Arc<dyn RemoteSource>,
    store: Arc<dyn LocalStore>,
    queue: Arc<dyn WorkQueue>,
    engine: SyncEngine,
    dispatcher: WorkDispatcher,
    update_all_cap: Option<usize>,
}

impl SolidrockSync {
    /// Create a service with default options.
    pub fn new(
        settings: Settings,
        remote: Arc<dyn RemoteSource>,
        store: Arc<dyn LocalStore>,
        queue: Arc<dyn WorkQueue>,
    ) -> Self {
        Self::with_options(settings, SyncOptions::default(), remote, store, queue)
    }

    /// Create a service with explicit options.
    pub fn with_options(
        settings: Settings,
        options: SyncOptions,
        remote: Arc<dyn RemoteSource>,
        store: Arc<dyn LocalStore>,
        queue: Arc<dyn WorkQueue>,
    ) -> Self {
        let settings = Arc::new(settings);
        let dispatcher = WorkDispatcher::new(queue.clone(), options.time_budget());
        let update_all_cap = options.update_all_cap();
        let engine = SyncEngine::new(
            settings.clone(),
            options,
            remote.clone(),
            store.clone(),
            dispatcher.clone(),
            RunLocks::new(),
        );

        Self {
            settings,
            remote,
            store,
            queue,
            engine,
            dispatcher,
            update_all_cap,
        }
    }

    /// Settings in use.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The reconciliation engine.
    #[must_use]
    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    /// An executor sharing this service's remote, store and queue.
    #[must_use]
    pub fn executor(&self) -> WorkExecutor {
        WorkExecutor::new(
            self.settings.clone(),
            self.remote.clone(),
            self.store.clone(),
            self.dispatcher.clone(),
        )
        .with_update_all_cap(self.update_all_cap)
    }

    /// A worker over this service's queue.
    #[must_use]
    pub fn worker(&self, config: WorkerConfig) -> SyncWorker {
        SyncWorker::new(self.queue.clone(), self.executor(), config)
    }

    /// Run a reconciliation of the collection now.
    ///
    /// Always returns the status line; failures are logged.
    #[instrument(skip(self), fields(collection = %collection))]
    pub async fn sync_now(&self, collection: Collection) -> String {
        if let Err(e) = self.try_sync(collection).await {
            error!(error_code = e.error_code(), error = %e, "Sync run did not complete");
        }
        sync_status(collection).to_string()
    }

    /// Run a reconciliation of the collection, returning its summary.
    pub async fn try_sync(&self, collection: Collection) -> SyncResult<RunSummary> {
        self.engine.run(collection).await
    }

    /// Queue an update of every existing local entry of the collection.
    ///
    /// The queued item fans out into one update per entry when the worker
    /// runs it. Does nothing when such an update is already pending. Always returns
    /// the status line; failures are logged.
    #[instrument(skip(self), fields(collection = %collection))]
    pub async fn schedule_update(&self, collection: Collection) -> String {
        if let Err(e) = self.settings.validate() {
            error!(error = %e, "Update not scheduled");
            return update_status(collection).to_string();
        }

        match self.dispatcher.submit(WorkItem::UpdateAll { collection }).await {
            Ok(EnqueueOutcome::Enqueued(id)) => info!(work_id = %id, "Scheduled update of local entries"),
            Ok(EnqueueOutcome::Duplicate(id)) => {
                info!(work_id = %id, "Update of local entries already scheduled");
            }
            Err(e) => warn!(error = %e, "Failed to schedule update of local entries"),
        }
        update_status(collection).to_string()
    }
}

impl std::fmt::Debug for SolidrockSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolidrockSync")
            .field("settings", &self.settings)
            .field("remote", &self.remote.display_name())
            .finish_non_exhaustive()
    }
}
