//! Sync settings.
//!
//! [`Settings`] holds the nine required values (API access plus the local
//! section, entry type and category group ids). [`SyncOptions`] holds the
//! tunables that have defaults.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use solidrock_connector::types::Collection;

use crate::error::{SyncError, SyncResult};
use crate::ids::{CategoryGroupId, EntryTypeId, SectionId};
use crate::reconciliation::UpdatePolicy;

/// Execution time budget of one synchronization work item, in seconds.
pub const SYNC_TIME_BUDGET_SECS: u64 = 600;

/// Most local entries one update-all pass queues.
pub const UPDATE_ALL_LIMIT: usize = 1500;

/// Required connection and target settings.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_url: String,
    pub api_key: String,
    pub api_username: String,
    pub api_password: String,
    pub churches_section_id: Option<SectionId>,
    pub churches_entry_type_id: Option<EntryTypeId>,
    pub jobs_section_id: Option<SectionId>,
    pub jobs_entry_type_id: Option<EntryTypeId>,
    pub jobs_category_group_id: Option<CategoryGroupId>,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("api_url", &self.api_url)
            .field("api_key", &"***")
            .field("api_username", &self.api_username)
            .field("api_password", &"***")
            .field("churches_section_id", &self.churches_section_id)
            .field("churches_entry_type_id", &self.churches_entry_type_id)
            .field("jobs_section_id", &self.jobs_section_id)
            .field("jobs_entry_type_id", &self.jobs_entry_type_id)
            .field("jobs_category_group_id", &self.jobs_category_group_id)
            .finish()
    }
}

/// Local section and entry type a collection is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionTarget {
    pub section: SectionId,
    pub entry_type: EntryTypeId,
}

fn parse_id<T: std::str::FromStr>(name: &str, value: Option<String>) -> SyncResult<Option<T>> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| SyncError::configuration(format!("{name} must be a numeric id, got '{raw}'"))),
    }
}

impl Settings {
    /// Load settings from `SOLIDROCK_*` environment variables.
    ///
    /// Missing variables are left empty; call [`Settings::validate`] before
    /// using the result.
    pub fn from_env() -> SyncResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> SyncResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |name: &str| lookup(name).unwrap_or_default();

        Ok(Self {
            api_url: text("SOLIDROCK_API_URL"),
            api_key: text("SOLIDROCK_API_KEY"),
            api_username: text("SOLIDROCK_API_USERNAME"),
            api_password: text("SOLIDROCK_API_PASSWORD"),
            churches_section_id: parse_id(
                "SOLIDROCK_CHURCHES_SECTION_ID",
                lookup("SOLIDROCK_CHURCHES_SECTION_ID"),
            )?,
            churches_entry_type_id: parse_id(
                "SOLIDROCK_CHURCHES_ENTRY_TYPE_ID",
                lookup("SOLIDROCK_CHURCHES_ENTRY_TYPE_ID"),
            )?,
            jobs_section_id: parse_id("SOLIDROCK_JOBS_SECTION_ID", lookup("SOLIDROCK_JOBS_SECTION_ID"))?,
            jobs_entry_type_id: parse_id(
                "SOLIDROCK_JOBS_ENTRY_TYPE_ID",
                lookup("SOLIDROCK_JOBS_ENTRY_TYPE_ID"),
            )?,
            jobs_category_group_id: parse_id(
                "SOLIDROCK_JOBS_CATEGORY_GROUP_ID",
                lookup("SOLIDROCK_JOBS_CATEGORY_GROUP_ID"),
            )?,
        })
    }

    /// Check that every required setting is present.
    ///
    /// Reports the first missing setting.
    pub fn validate(&self) -> SyncResult<()> {
        let checks = [
            (self.api_url.trim().is_empty(), "No API URL provided in settings"),
            (self.api_key.trim().is_empty(), "No API Key provided in settings"),
            (
                self.api_username.trim().is_empty(),
                "No Solidrock Username provided in settings",
            ),
            (
                self.api_password.is_empty(),
                "No Solidrock Password provided in settings",
            ),
            (
                self.churches_section_id.is_none(),
                "No Churches Section ID provided in settings",
            ),
            (
                self.churches_entry_type_id.is_none(),
                "No Churches Entry Type ID provided in settings",
            ),
            (
                self.jobs_section_id.is_none(),
                "No Jobs Section ID provided in settings",
            ),
            (
                self.jobs_entry_type_id.is_none(),
                "No Jobs Entry Type ID provided in settings",
            ),
            (
                self.jobs_category_group_id.is_none(),
                "No Jobs Category Group ID provided in settings",
            ),
        ];

        match checks.iter().find(|(missing, _)| *missing) {
            Some((_, message)) => Err(SyncError::configuration(*message)),
            None => Ok(()),
        }
    }

    /// Section and entry type the collection is written to.
    pub fn target(&self, collection: Collection) -> SyncResult<CollectionTarget> {
        let (section, entry_type, label) = match collection {
            Collection::Churches => (
                self.churches_section_id,
                self.churches_entry_type_id,
                "Churches",
            ),
            Collection::Jobs => (self.jobs_section_id, self.jobs_entry_type_id, "Jobs"),
        };
        match (section, entry_type) {
            (Some(section), Some(entry_type)) => Ok(CollectionTarget {
                section,
                entry_type,
            }),
            _ => Err(SyncError::configuration(format!(
                "No {label} section or entry type configured"
            ))),
        }
    }

    /// Category group job categories are kept in.
    pub fn category_group(&self) -> SyncResult<CategoryGroupId> {
        self.jobs_category_group_id
            .ok_or_else(|| SyncError::configuration("No Jobs Category Group ID provided in settings"))
    }
}

/// Tunable sync behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncOptions {
    /// Update gating for churches (default: when remote newer).
    #[serde(default = "default_churches_policy")]
    pub churches_policy: UpdatePolicy,

    /// Update gating for jobs (default: always).
    #[serde(default = "default_jobs_policy")]
    pub jobs_policy: UpdatePolicy,

    /// Time budget of each work item in seconds (default: 600).
    #[serde(default = "default_time_budget_secs")]
    pub time_budget_secs: u64,

    /// Cap on entries queued by an update-all pass, lowest id first
    /// (default: 1500, 0 for no cap).
    #[serde(default = "default_update_all_limit")]
    pub update_all_limit: usize,
}

fn default_churches_policy() -> UpdatePolicy {
    UpdatePolicy::WhenRemoteNewer
}

fn default_jobs_policy() -> UpdatePolicy {
    UpdatePolicy::Always
}

fn default_time_budget_secs() -> u64 {
    SYNC_TIME_BUDGET_SECS
}

fn default_update_all_limit() -> usize {
    UPDATE_ALL_LIMIT
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            churches_policy: default_churches_policy(),
            jobs_policy: default_jobs_policy(),
            time_budget_secs: default_time_budget_secs(),
            update_all_limit: default_update_all_limit(),
        }
    }
}

impl SyncOptions {
    /// Load options from environment variables, falling back to defaults.
    pub fn from_env() -> SyncResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load options through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> SyncResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();

        if let Some(raw) = lookup("SOLIDROCK_CHURCHES_UPDATE_POLICY") {
            options.churches_policy = raw.parse().map_err(SyncError::configuration)?;
        }
        if let Some(raw) = lookup("SOLIDROCK_JOBS_UPDATE_POLICY") {
            options.jobs_policy = raw.parse().map_err(SyncError::configuration)?;
        }
        if let Some(raw) = lookup("SOLIDROCK_WORK_TIME_BUDGET_SECS") {
            options.time_budget_secs = raw.trim().parse().map_err(|_| {
                SyncError::configuration(format!(
                    "SOLIDROCK_WORK_TIME_BUDGET_SECS must be a number of seconds, got '{raw}'"
                ))
            })?;
        }
        if let Some(raw) = lookup("SOLIDROCK_UPDATE_ALL_LIMIT") {
            options.update_all_limit = raw.trim().parse().map_err(|_| {
                SyncError::configuration(format!(
                    "SOLIDROCK_UPDATE_ALL_LIMIT must be a number of entries, got '{raw}'"
                ))
            })?;
        }

        Ok(options)
    }

    /// Update policy of a collection.
    #[must_use]
    pub fn policy_for(&self, collection: Collection) -> UpdatePolicy {
        match collection {
            Collection::Churches => self.churches_policy,
            Collection::Jobs => self.jobs_policy,
        }
    }

    /// Time budget of each work item.
    #[must_use]
    pub fn time_budget(&self) -> Duration {
        Duration::from_secs(self.time_budget_secs)
    }

    /// Cap on entries queued by an update-all pass; `None` when unlimited.
    #[must_use]
    pub fn update_all_cap(&self) -> Option<usize> {
        (self.update_all_limit > 0).then_some(self.update_all_limit)
    }
}

#[cfg(test)]
pub(crate) fn test_settings() -> Settings {
    Settings {
        api_url: "https://api.solidrock.example/".to_string(),
        api_key: "key".to_string(),
        api_username: "sync".to_string(),
        api_password: "secret".to_string(),
        churches_section_id: Some(SectionId::new(1)),
        churches_entry_type_id: Some(EntryTypeId::new(11)),
        jobs_section_id: Some(SectionId::new(2)),
        jobs_entry_type_id: Some(EntryTypeId::new(12)),
        jobs_category_group_id: Some(CategoryGroupId::new(3)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_valid_settings() {
        assert!(test_settings().validate().is_ok());
    }

    #[test]
    fn test_validate_reports_first_missing() {
        let mut settings = test_settings();
        settings.api_key = String::new();
        settings.jobs_section_id = None;

        let err = settings.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: No API Key provided in settings"
        );
    }

    #[test]
    fn test_validate_category_group_required() {
        let mut settings = test_settings();
        settings.jobs_category_group_id = None;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("Category Group"));
    }

    #[test]
    fn test_from_lookup() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("SOLIDROCK_API_URL", "https://api.solidrock.example/"),
            ("SOLIDROCK_API_KEY", "k"),
            ("SOLIDROCK_API_USERNAME", "u"),
            ("SOLIDROCK_API_PASSWORD", "p"),
            ("SOLIDROCK_CHURCHES_SECTION_ID", "4"),
            ("SOLIDROCK_CHURCHES_ENTRY_TYPE_ID", "5"),
            ("SOLIDROCK_JOBS_SECTION_ID", "6"),
            ("SOLIDROCK_JOBS_ENTRY_TYPE_ID", "7"),
            ("SOLIDROCK_JOBS_CATEGORY_GROUP_ID", "8"),
        ]))
        .unwrap();

        assert!(settings.validate().is_ok());
        let target = settings.target(Collection::Jobs).unwrap();
        assert_eq!(target.section, SectionId::new(6));
        assert_eq!(target.entry_type, EntryTypeId::new(7));
        assert_eq!(settings.category_group().unwrap(), CategoryGroupId::new(8));
    }

    #[test]
    fn test_from_lookup_missing_and_invalid() {
        let settings = Settings::from_lookup(lookup_from(&[("SOLIDROCK_JOBS_SECTION_ID", "")])).unwrap();
        assert!(settings.jobs_section_id.is_none());
        assert!(settings.validate().is_err());

        let err =
            Settings::from_lookup(lookup_from(&[("SOLIDROCK_JOBS_SECTION_ID", "jobs")])).unwrap_err();
        assert!(err.to_string().contains("SOLIDROCK_JOBS_SECTION_ID"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug = format!("{:?}", test_settings());
        assert!(!debug.contains("secret"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn test_options_defaults() {
        let options = SyncOptions::default();
        assert_eq!(options.policy_for(Collection::Churches), UpdatePolicy::WhenRemoteNewer);
        assert_eq!(options.policy_for(Collection::Jobs), UpdatePolicy::Always);
        assert_eq!(options.time_budget(), Duration::from_secs(600));
        assert_eq!(options.update_all_cap(), Some(1500));
    }

    #[test]
    fn test_options_from_lookup() {
        let options = SyncOptions::from_lookup(lookup_from(&[
            ("SOLIDROCK_JOBS_UPDATE_POLICY", "when_remote_newer"),
            ("SOLIDROCK_WORK_TIME_BUDGET_SECS", "120"),
        ]))
        .unwrap();
        assert_eq!(options.jobs_policy, UpdatePolicy::WhenRemoteNewer);
        assert_eq!(options.churches_policy, UpdatePolicy::WhenRemoteNewer);
        assert_eq!(options.time_budget_secs, 120);

        let unlimited =
            SyncOptions::from_lookup(lookup_from(&[("SOLIDROCK_UPDATE_ALL_LIMIT", "0")])).unwrap();
        assert_eq!(unlimited.update_all_cap(), None);
        assert!(
            SyncOptions::from_lookup(lookup_from(&[("SOLIDROCK_UPDATE_ALL_LIMIT", "many")])).is_err()
        );

        assert!(SyncOptions::from_lookup(lookup_from(&[(
            "SOLIDROCK_CHURCHES_UPDATE_POLICY",
            "sometimes"
        )]))
        .is_err());
    }
}
