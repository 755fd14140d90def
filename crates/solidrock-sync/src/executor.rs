//! Executes queued work items against the remote and the local store.
//!
//! Every item re-reads current state before writing: a create finds an entry
//! that appeared since the plan was computed and updates it instead, and a
//! disable is skipped when the entry is already disabled. An update-all item
//! writes nothing itself; it fans out into one queued update per entry.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use solidrock_connector::traits::RemoteSource;
use solidrock_connector::types::Collection;

use crate::dispatch::{WorkDispatcher, WorkItem};
use crate::error::{SyncError, SyncResult};
use crate::ids::EntryId;
use crate::mapper::{FieldMapper, MapPurpose};
use crate::settings::{Settings, UPDATE_ALL_LIMIT};
use crate::store::LocalStore;

/// What executing a work item did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WorkOutcome {
    Created { entry_id: EntryId },
    Updated { entry_id: EntryId },
    Disabled { entry_id: EntryId },
    /// Nothing needed writing.
    Unchanged { entry_id: EntryId },
    /// The item could not be applied and will not be retried.
    Skipped { reason: String },
    /// Per-entry updates queued by an update-all item.
    UpdatesQueued {
        enqueued: u32,
        duplicates: u32,
        failed: u32,
    },
}

impl WorkOutcome {
    fn skipped(reason: impl Into<String>) -> Self {
        WorkOutcome::Skipped {
            reason: reason.into(),
        }
    }
}

/// Applies work items.
#[derive(Clone)]
pub struct WorkExecutor {
    settings: Arc<Settings>,
    remote: Arc<dyn RemoteSource>,
    store: Arc<dyn LocalStore>,
    dispatcher: WorkDispatcher,
    update_all_cap: Option<usize>,
}

impl WorkExecutor {
    /// Create an executor. Update-all items fan out through `dispatcher`.
    pub fn new(
        settings: Arc<Settings>,
        remote: Arc<dyn RemoteSource>,
        store: Arc<dyn LocalStore>,
        dispatcher: WorkDispatcher,
    ) -> Self {
        Self {
            settings,
            remote,
            store,
            dispatcher,
            update_all_cap: Some(UPDATE_ALL_LIMIT),
        }
    }

    /// Cap the entries one update-all item queues; `None` lifts the cap.
    #[must_use]
    pub fn with_update_all_cap(mut self, cap: Option<usize>) -> Self {
        self.update_all_cap = cap;
        self
    }

    /// Execute one work item.
    #[instrument(skip(self, item), fields(collection = %item.collection(), kind = item.kind()))]
    pub async fn execute(&self, item: &WorkItem) -> SyncResult<WorkOutcome> {
        self.settings.validate()?;

        match item {
            WorkItem::Create {
                collection,
                remote_id,
            } => self.create(*collection, remote_id).await,
            WorkItem::Update {
                collection,
                remote_id,
                entry_id,
            } => self.update(*collection, remote_id, *entry_id).await,
            WorkItem::Disable {
                collection,
                entry_id,
            } => self.disable(*collection, *entry_id).await,
            WorkItem::UpdateAll { collection } => self.update_all(*collection).await,
        }
    }

    fn mapper(&self) -> SyncResult<FieldMapper> {
        FieldMapper::from_settings(self.store.clone(), &self.settings)
    }

    async fn create(&self, collection: Collection, remote_id: &str) -> SyncResult<WorkOutcome> {
        let target = self.settings.target(collection)?;

        if let Some(existing) = self
            .store
            .find_by_identity(target.section, collection.identity_field(), remote_id)
            .await?
        {
            info!(
                remote_id = remote_id,
                entry_id = %existing.id,
                "Entry already exists, updating instead"
            );
            return self.update(collection, remote_id, existing.id).await;
        }

        let Some(detail) = self.remote.fetch_one(collection, remote_id).await? else {
            warn!(remote_id = remote_id, "Remote record not found");
            return Ok(WorkOutcome::skipped(format!("remote record {remote_id} not found")));
        };

        let mapped = self
            .mapper()?
            .map(remote_id, &detail, MapPurpose::Create, Utc::now())
            .await?;
        let entry_id = self
            .store
            .create_entry(target.section, target.entry_type, &mapped)
            .await?;

        info!(remote_id = remote_id, entry_id = %entry_id, title = %mapped.title, "Created entry");
        Ok(WorkOutcome::Created { entry_id })
    }

    async fn update(
        &self,
        collection: Collection,
        remote_id: &str,
        entry_id: EntryId,
    ) -> SyncResult<WorkOutcome> {
        let target = self.settings.target(collection)?;

        if self.store.get_entry(target.section, entry_id).await?.is_none() {
            return Err(SyncError::not_found("Entry", entry_id.to_string()));
        }

        let Some(detail) = self.remote.fetch_one(collection, remote_id).await? else {
            warn!(remote_id = remote_id, entry_id = %entry_id, "Remote record not found");
            return Ok(WorkOutcome::skipped(format!("remote record {remote_id} not found")));
        };

        let mapped = self
            .mapper()?
            .map(remote_id, &detail, MapPurpose::Update, Utc::now())
            .await?;
        self.store.update_entry(entry_id, &mapped).await?;

        info!(remote_id = remote_id, entry_id = %entry_id, title = %mapped.title, "Updated entry");
        Ok(WorkOutcome::Updated { entry_id })
    }

    async fn disable(&self, collection: Collection, entry_id: EntryId) -> SyncResult<WorkOutcome> {
        let target = self.settings.target(collection)?;

        let Some(entry) = self.store.get_entry(target.section, entry_id).await? else {
            warn!(entry_id = %entry_id, "Entry to disable no longer exists");
            return Ok(WorkOutcome::skipped(format!("entry {entry_id} not found")));
        };

        if !entry.enabled {
            debug!(entry_id = %entry_id, "Entry already disabled");
            return Ok(WorkOutcome::Unchanged { entry_id });
        }

        self.store.set_enabled(entry_id, false).await?;
        info!(entry_id = %entry_id, title = %entry.title, "Disabled entry");
        Ok(WorkOutcome::Disabled { entry_id })
    }

    /// Queue an update of every keyed local entry of the collection.
    ///
    /// Entries are taken lowest id first, up to the cap. Each update runs as
    /// its own work item with its own time budget and retries.
    async fn update_all(&self, collection: Collection) -> SyncResult<WorkOutcome> {
        let target = self.settings.target(collection)?;

        let mut entries: Vec<_> = self
            .store
            .list_entries(target.section, collection.identity_field())
            .await?
            .into_iter()
            .filter(|e| !e.identity_key.is_empty())
            .collect();
        entries.sort_by_key(|e| e.id);

        let total = entries.len();
        if let Some(cap) = self.update_all_cap {
            if total > cap {
                warn!(total, cap, "Update of local entries capped");
                entries.truncate(cap);
            }
        }

        let items = entries.into_iter().map(|entry| WorkItem::Update {
            collection,
            remote_id: entry.identity_key,
            entry_id: entry.id,
        });
        let report = self.dispatcher.submit_all(items).await;

        info!(
            enqueued = report.enqueued,
            duplicates = report.duplicates,
            failed = report.failed,
            "Queued update of local entries"
        );
        Ok(WorkOutcome::UpdatesQueued {
            enqueued: report.enqueued,
            duplicates: report.duplicates,
            failed: report.failed,
        })
    }
}

impl std::fmt::Debug for WorkExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkExecutor")
            .field("remote", &self.remote.display_name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{FieldSet, FieldValue, MappedEntry};
    use crate::ids::{EntryTypeId, SectionId};
    use crate::queue::{MemoryQueue, WorkQueue};
    use crate::settings::test_settings;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use solidrock_connector::error::ConnectorResult;
    use solidrock_connector::record::RemoteRecordDetail;
    use solidrock_connector::types::RemoteRecordSummary;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const CHURCHES: SectionId = SectionId::new(1);
    const CHURCH_TYPE: EntryTypeId = EntryTypeId::new(11);

    struct DetailSource {
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl RemoteSource for DetailSource {
        async fn list_all(&self, _collection: Collection) -> ConnectorResult<Vec<RemoteRecordSummary>> {
            Ok(Vec::new())
        }

        async fn fetch_one(
            &self,
            collection: Collection,
            id: &str,
        ) -> ConnectorResult<Option<RemoteRecordDetail>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if id == "gone" {
                return Ok(None);
            }
            let body = serde_json::json!({
                "gathering": {"id": id, "name": format!("Gathering {id}"), "status_id": "1"}
            });
            Ok(RemoteRecordDetail::from_body(collection, body).ok().flatten())
        }
    }

    fn seeded(key: &str, enabled: bool) -> MappedEntry {
        let mut fields = FieldSet::new();
        fields.insert("gatheringId".to_string(), FieldValue::text(key));
        MappedEntry {
            title: format!("Old {key}"),
            enabled,
            fields,
            post_date: None,
            expiry_date: None,
        }
    }

    fn dispatcher(queue: Arc<MemoryQueue>) -> WorkDispatcher {
        WorkDispatcher::new(queue, Duration::from_secs(600))
    }

    fn executor(store: Arc<MemoryStore>) -> (WorkExecutor, Arc<DetailSource>) {
        let source = Arc::new(DetailSource {
            fetches: AtomicUsize::new(0),
        });
        let queue = Arc::new(MemoryQueue::new());
        (
            WorkExecutor::new(Arc::new(test_settings()), source.clone(), store, dispatcher(queue)),
            source,
        )
    }

    #[tokio::test]
    async fn test_create_writes_entry() {
        let store = Arc::new(MemoryStore::new());
        let (executor, _) = executor(store.clone());

        let outcome = executor
            .execute(&WorkItem::Create {
                collection: Collection::Churches,
                remote_id: "12".to_string(),
            })
            .await
            .unwrap();

        let WorkOutcome::Created { entry_id } = outcome else {
            panic!("expected create, got {outcome:?}");
        };
        let entry = store.get_entry(CHURCHES, entry_id).await.unwrap().unwrap();
        assert_eq!(entry.title, "Gathering 12");
        assert!(entry.post_date.is_some());
    }

    #[tokio::test]
    async fn test_create_falls_back_to_update() {
        let store = Arc::new(MemoryStore::new());
        let existing = store
            .seed_entry(CHURCHES, CHURCH_TYPE, &seeded("12", true), Utc::now())
            .await
            .unwrap();
        let (executor, _) = executor(store.clone());

        let outcome = executor
            .execute(&WorkItem::Create {
                collection: Collection::Churches,
                remote_id: "12".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(outcome, WorkOutcome::Updated { entry_id: existing });
        assert_eq!(store.entry_count().await, 1);
    }

    #[tokio::test]
    async fn test_remote_record_gone_is_skipped() {
        let store = Arc::new(MemoryStore::new());
        let (executor, _) = executor(store.clone());

        let outcome = executor
            .execute(&WorkItem::Create {
                collection: Collection::Churches,
                remote_id: "gone".to_string(),
            })
            .await
            .unwrap();
        assert!(matches!(outcome, WorkOutcome::Skipped { .. }));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_disable_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let id = store
            .seed_entry(CHURCHES, CHURCH_TYPE, &seeded("9", true), Utc::now())
            .await
            .unwrap();
        let (executor, _) = executor(store.clone());
        let item = WorkItem::Disable {
            collection: Collection::Churches,
            entry_id: id,
        };

        assert_eq!(
            executor.execute(&item).await.unwrap(),
            WorkOutcome::Disabled { entry_id: id }
        );
        assert_eq!(
            executor.execute(&item).await.unwrap(),
            WorkOutcome::Unchanged { entry_id: id }
        );
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_entry_fails() {
        let store = Arc::new(MemoryStore::new());
        let (executor, source) = executor(store);

        let err = executor
            .execute(&WorkItem::Update {
                collection: Collection::Churches,
                remote_id: "12".to_string(),
                entry_id: EntryId::new(77),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::NotFound { .. }));
        assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_update_all_queues_one_update_per_keyed_entry() {
        let store = Arc::new(MemoryStore::new());
        let mut ids = Vec::new();
        for key in ["1", "2", "gone", ""] {
            ids.push(
                store
                    .seed_entry(CHURCHES, CHURCH_TYPE, &seeded(key, true), Utc::now())
                    .await
                    .unwrap(),
            );
        }
        let source = Arc::new(DetailSource {
            fetches: AtomicUsize::new(0),
        });
        let queue = Arc::new(MemoryQueue::new());
        let executor = WorkExecutor::new(
            Arc::new(test_settings()),
            source.clone(),
            store.clone(),
            dispatcher(queue.clone()),
        );
        let item = WorkItem::UpdateAll {
            collection: Collection::Churches,
        };

        let outcome = executor.execute(&item).await.unwrap();
        assert_eq!(
            outcome,
            WorkOutcome::UpdatesQueued {
                enqueued: 3,
                duplicates: 0,
                failed: 0
            }
        );
        assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
        assert_eq!(store.write_count(), 0);

        let mut queued = Vec::new();
        while let Some(work) = queue.dequeue().await.unwrap() {
            queued.push(work.item.clone());
            queue.complete(work.id).await.unwrap();
        }
        assert_eq!(
            queued,
            vec![
                WorkItem::Update {
                    collection: Collection::Churches,
                    remote_id: "1".to_string(),
                    entry_id: ids[0]
                },
                WorkItem::Update {
                    collection: Collection::Churches,
                    remote_id: "2".to_string(),
                    entry_id: ids[1]
                },
                WorkItem::Update {
                    collection: Collection::Churches,
                    remote_id: "gone".to_string(),
                    entry_id: ids[2]
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_update_all_skips_pending_updates() {
        let store = Arc::new(MemoryStore::new());
        let id = store
            .seed_entry(CHURCHES, CHURCH_TYPE, &seeded("1", true), Utc::now())
            .await
            .unwrap();
        let queue = Arc::new(MemoryQueue::new());
        let shared = dispatcher(queue.clone());
        shared
            .submit(WorkItem::Update {
                collection: Collection::Churches,
                remote_id: "1".to_string(),
                entry_id: id,
            })
            .await
            .unwrap();
        let source = Arc::new(DetailSource {
            fetches: AtomicUsize::new(0),
        });
        let executor = WorkExecutor::new(Arc::new(test_settings()), source, store, shared);

        let outcome = executor
            .execute(&WorkItem::UpdateAll {
                collection: Collection::Churches,
            })
            .await
            .unwrap();
        assert_eq!(
            outcome,
            WorkOutcome::UpdatesQueued {
                enqueued: 0,
                duplicates: 1,
                failed: 0
            }
        );
        assert_eq!(queue.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_all_respects_cap() {
        let store = Arc::new(MemoryStore::new());
        let mut ids = Vec::new();
        for key in ["1", "2", "3", "4"] {
            ids.push(
                store
                    .seed_entry(CHURCHES, CHURCH_TYPE, &seeded(key, true), Utc::now())
                    .await
                    .unwrap(),
            );
        }
        let source = Arc::new(DetailSource {
            fetches: AtomicUsize::new(0),
        });
        let queue = Arc::new(MemoryQueue::new());
        let capped = WorkExecutor::new(
            Arc::new(test_settings()),
            source.clone(),
            store.clone(),
            dispatcher(queue.clone()),
        )
        .with_update_all_cap(Some(2));
        let item = WorkItem::UpdateAll {
            collection: Collection::Churches,
        };

        let outcome = capped.execute(&item).await.unwrap();
        assert!(matches!(outcome, WorkOutcome::UpdatesQueued { enqueued: 2, .. }));

        let mut queued_ids = Vec::new();
        while let Some(work) = queue.dequeue().await.unwrap() {
            if let WorkItem::Update { entry_id, .. } = work.item {
                queued_ids.push(entry_id);
            }
            queue.complete(work.id).await.unwrap();
        }
        assert_eq!(queued_ids, ids[..2].to_vec());

        let uncapped = capped.with_update_all_cap(None);
        let outcome = uncapped.execute(&item).await.unwrap();
        assert!(matches!(outcome, WorkOutcome::UpdatesQueued { enqueued: 4, .. }));
    }

    #[tokio::test]
    async fn test_incomplete_settings_rejected() {
        let store = Arc::new(MemoryStore::new());
        let source = Arc::new(DetailSource {
            fetches: AtomicUsize::new(0),
        });
        let mut settings = test_settings();
        settings.jobs_category_group_id = None;
        let executor = WorkExecutor::new(
            Arc::new(settings),
            source.clone(),
            store,
            dispatcher(Arc::new(MemoryQueue::new())),
        );

        let err = executor
            .execute(&WorkItem::Create {
                collection: Collection::Churches,
                remote_id: "1".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Configuration { .. }));
        assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
    }
}
