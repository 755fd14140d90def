//! Local entry store.
//!
//! [`LocalStore`] is the contract the engine writes through. [`MemoryStore`]
//! keeps entries in memory and can mirror them to a JSON snapshot file.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error};

use crate::fields::{FieldSet, FieldValue, MappedEntry};
use crate::ids::{CategoryGroupId, EntryId, EntryTypeId, SectionId};

/// Errors raised by a local store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Entry does not exist.
    #[error("entry {entry_id} not found")]
    NotFound { entry_id: EntryId },

    /// The store refused to persist an entry.
    #[error("couldn't save \"{title}\": {message}")]
    Rejected { title: String, message: String },

    /// A category with this external id already exists in the group.
    #[error("category with external id '{external_id}' already exists in group {group}")]
    DuplicateCategory {
        group: CategoryGroupId,
        external_id: String,
    },

    /// Snapshot file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Create a rejection error.
    pub fn rejected(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A persisted entry as seen by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalEntry {
    pub id: EntryId,
    pub section: SectionId,
    pub entry_type: EntryTypeId,
    /// Value of the requested identity field; empty when absent.
    pub identity_key: String,
    pub enabled: bool,
    pub title: String,
    /// Time of the last write.
    pub date_updated: Option<DateTime<Utc>>,
    pub post_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub fields: FieldSet,
}

/// A local category carrying an external category id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryLink {
    pub id: EntryId,
    pub group: CategoryGroupId,
    pub title: String,
    pub external_id: String,
}

/// Storage the engine reads local state from and writes mapped entries to.
///
/// All mutation is single-entry; there are no multi-entry transactions.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// List every entry of a section, enabled or not, with its identity key
    /// read from `identity_field`.
    async fn list_entries(
        &self,
        section: SectionId,
        identity_field: &str,
    ) -> StoreResult<Vec<LocalEntry>>;

    /// Get one entry of a section.
    async fn get_entry(&self, section: SectionId, id: EntryId) -> StoreResult<Option<LocalEntry>>;

    /// Find the entry of a section whose identity field equals `key`.
    ///
    /// When several match, the lowest id wins.
    async fn find_by_identity(
        &self,
        section: SectionId,
        identity_field: &str,
        key: &str,
    ) -> StoreResult<Option<LocalEntry>>;

    /// Create an entry and return its id.
    async fn create_entry(
        &self,
        section: SectionId,
        entry_type: EntryTypeId,
        entry: &MappedEntry,
    ) -> StoreResult<EntryId>;

    /// Overwrite title, enabled flag, fields and dates of an entry.
    async fn update_entry(&self, id: EntryId, entry: &MappedEntry) -> StoreResult<()>;

    /// Set the enabled flag of an entry.
    async fn set_enabled(&self, id: EntryId, enabled: bool) -> StoreResult<()>;

    /// List the categories of a group.
    async fn list_categories(&self, group: CategoryGroupId) -> StoreResult<Vec<CategoryLink>>;

    /// Create a category; fails if the external id is already used in the group.
    async fn create_category(
        &self,
        group: CategoryGroupId,
        title: &str,
        external_id: &str,
    ) -> StoreResult<EntryId>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    id: EntryId,
    section: SectionId,
    entry_type: EntryTypeId,
    enabled: bool,
    title: String,
    date_created: DateTime<Utc>,
    date_updated: DateTime<Utc>,
    post_date: Option<DateTime<Utc>>,
    expiry_date: Option<DateTime<Utc>>,
    fields: FieldSet,
}

impl StoredEntry {
    fn identity(&self, identity_field: &str) -> &str {
        self.fields
            .get(identity_field)
            .and_then(FieldValue::as_text)
            .unwrap_or_default()
    }

    fn project(&self, identity_field: &str) -> LocalEntry {
        LocalEntry {
            id: self.id,
            section: self.section,
            entry_type: self.entry_type,
            identity_key: self.identity(identity_field).to_string(),
            enabled: self.enabled,
            title: self.title.clone(),
            date_updated: Some(self.date_updated),
            post_date: self.post_date,
            expiry_date: self.expiry_date,
            fields: self.fields.clone(),
        }
    }

    fn apply(&mut self, entry: &MappedEntry, now: DateTime<Utc>) {
        self.title = entry.title.clone();
        self.enabled = entry.enabled;
        self.fields = entry.fields.clone();
        if let Some(post_date) = entry.post_date {
            self.post_date = Some(post_date);
        }
        self.expiry_date = entry.expiry_date;
        self.date_updated = now;
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreState {
    next_id: u64,
    entries: BTreeMap<EntryId, StoredEntry>,
    categories: BTreeMap<EntryId, CategoryLink>,
}

impl StoreState {
    fn allocate_id(&mut self) -> EntryId {
        self.next_id += 1;
        EntryId::new(self.next_id)
    }
}

/// In-memory [`LocalStore`] with an optional JSON snapshot file.
///
/// Entries and categories share one id sequence. Every successful write is
/// counted; see [`MemoryStore::write_count`].
pub struct MemoryStore {
    state: RwLock<StoreState>,
    snapshot: Option<PathBuf>,
    writes: AtomicUsize,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("snapshot", &self.snapshot)
            .field("writes", &self.writes.load(Ordering::SeqCst))
            .finish()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store without persistence.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            snapshot: None,
            writes: AtomicUsize::new(0),
        }
    }

    /// Open a store backed by a JSON snapshot, loading it if it exists.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreState::default(),
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), "Opened snapshot store");

        Ok(Self {
            state: RwLock::new(state),
            snapshot: Some(path),
            writes: AtomicUsize::new(0),
        })
    }

    /// Number of successful writes since the store was created.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Insert an entry with a fixed last-write time, without counting it as
    /// a write. Used to seed existing local state.
    pub async fn seed_entry(
        &self,
        section: SectionId,
        entry_type: EntryTypeId,
        entry: &MappedEntry,
        date_updated: DateTime<Utc>,
    ) -> StoreResult<EntryId> {
        let mut state = self.state.write().await;
        let id = state.allocate_id();
        state.entries.insert(
            id,
            StoredEntry {
                id,
                section,
                entry_type,
                enabled: entry.enabled,
                title: entry.title.clone(),
                date_created: date_updated,
                date_updated,
                post_date: entry.post_date,
                expiry_date: entry.expiry_date,
                fields: entry.fields.clone(),
            },
        );
        self.persist(&state).await?;
        Ok(id)
    }

    /// Total number of entries across all sections.
    pub async fn entry_count(&self) -> usize {
        self.state.read().await.entries.len()
    }

    async fn persist(&self, state: &StoreState) -> StoreResult<()> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };
        let bytes = serde_json::to_vec_pretty(state)?;
        tokio::fs::write(path, bytes).await.map_err(|e| {
            error!(path = %path.display(), error = %e, "Failed to write snapshot");
            StoreError::from(e)
        })
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

fn check_title(title: &str) -> StoreResult<()> {
    if title.trim().is_empty() {
        return Err(StoreError::rejected(title, "title cannot be blank"));
    }
    Ok(())
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn list_entries(
        &self,
        section: SectionId,
        identity_field: &str,
    ) -> StoreResult<Vec<LocalEntry>> {
        let state = self.state.read().await;
        Ok(state
            .entries
            .values()
            .filter(|e| e.section == section)
            .map(|e| e.project(identity_field))
            .collect())
    }

    async fn get_entry(&self, section: SectionId, id: EntryId) -> StoreResult<Option<LocalEntry>> {
        let state = self.state.read().await;
        Ok(state
            .entries
            .get(&id)
            .filter(|e| e.section == section)
            .map(|e| e.project("")))
    }

    async fn find_by_identity(
        &self,
        section: SectionId,
        identity_field: &str,
        key: &str,
    ) -> StoreResult<Option<LocalEntry>> {
        if key.is_empty() {
            return Ok(None);
        }
        let state = self.state.read().await;
        Ok(state
            .entries
            .values()
            .find(|e| e.section == section && e.identity(identity_field) == key)
            .map(|e| e.project(identity_field)))
    }

    async fn create_entry(
        &self,
        section: SectionId,
        entry_type: EntryTypeId,
        entry: &MappedEntry,
    ) -> StoreResult<EntryId> {
        check_title(&entry.title)?;

        let now = Utc::now();
        let mut state = self.state.write().await;
        let id = state.allocate_id();
        let mut stored = StoredEntry {
            id,
            section,
            entry_type,
            enabled: entry.enabled,
            title: String::new(),
            date_created: now,
            date_updated: now,
            post_date: None,
            expiry_date: None,
            fields: FieldSet::new(),
        };
        stored.apply(entry, now);
        state.entries.insert(id, stored);
        self.persist(&state).await?;
        self.record_write();

        debug!(entry_id = %id, section = %section, title = %entry.title, "Created entry");
        Ok(id)
    }

    async fn update_entry(&self, id: EntryId, entry: &MappedEntry) -> StoreResult<()> {
        check_title(&entry.title)?;

        let mut state = self.state.write().await;
        let stored = state
            .entries
            .get_mut(&id)
            .ok_or(StoreError::NotFound { entry_id: id })?;
        stored.apply(entry, Utc::now());
        self.persist(&state).await?;
        self.record_write();

        debug!(entry_id = %id, title = %entry.title, "Updated entry");
        Ok(())
    }

    async fn set_enabled(&self, id: EntryId, enabled: bool) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let stored = state
            .entries
            .get_mut(&id)
            .ok_or(StoreError::NotFound { entry_id: id })?;
        stored.enabled = enabled;
        stored.date_updated = Utc::now();
        self.persist(&state).await?;
        self.record_write();

        debug!(entry_id = %id, enabled = enabled, "Set entry status");
        Ok(())
    }

    async fn list_categories(&self, group: CategoryGroupId) -> StoreResult<Vec<CategoryLink>> {
        let state = self.state.read().await;
        Ok(state
            .categories
            .values()
            .filter(|c| c.group == group)
            .cloned()
            .collect())
    }

    async fn create_category(
        &self,
        group: CategoryGroupId,
        title: &str,
        external_id: &str,
    ) -> StoreResult<EntryId> {
        check_title(title)?;

        let mut state = self.state.write().await;
        if state
            .categories
            .values()
            .any(|c| c.group == group && c.external_id == external_id)
        {
            return Err(StoreError::DuplicateCategory {
                group,
                external_id: external_id.to_string(),
            });
        }

        let id = state.allocate_id();
        state.categories.insert(
            id,
            CategoryLink {
                id,
                group,
                title: title.to_string(),
                external_id: external_id.to_string(),
            },
        );
        self.persist(&state).await?;
        self.record_write();

        debug!(category_id = %id, group = %group, external_id = external_id, "Created category");
        Ok(id)
    }
}
