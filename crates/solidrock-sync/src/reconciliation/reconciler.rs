//! Turns a reconciliation plan into per-record actions.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

use solidrock_connector::types::{Collection, RemoteRecordSummary};

use super::plan::ReconciliationPlan;
use super::policy::UpdatePolicy;
use crate::ids::EntryId;
use crate::store::LocalEntry;

/// One unit of work decided by a sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SyncAction {
    /// Create a local entry for a remote record.
    Create { remote_id: String },
    /// Rewrite an existing local entry from its remote record.
    Update { remote_id: String, entry_id: EntryId },
    /// Disable a local entry whose remote record is gone.
    Disable { entry_id: EntryId },
}

impl SyncAction {
    /// Action type name.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            SyncAction::Create { .. } => "create",
            SyncAction::Update { .. } => "update",
            SyncAction::Disable { .. } => "disable",
        }
    }
}

/// Outcome of [`Reconciler::decide`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decision {
    pub actions: Vec<SyncAction>,
    /// Updating keys held back by the update policy.
    pub updates_skipped: u32,
    /// Local entries sharing an identity key with a lower-id entry.
    pub duplicates: u32,
}

/// Decides create, update and disable actions from a plan.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reconciler;

impl Reconciler {
    /// Decide the actions of one run.
    ///
    /// Every missing key becomes a create. Every updating key becomes an
    /// update of the lowest-id local entry carrying it, unless the policy
    /// holds it back; a disabled entry is always updated. Every enabled
    /// local entry whose key is in `removed` becomes a disable; entries with
    /// an empty key are treated the same.
    pub fn decide(
        collection: Collection,
        plan: &ReconciliationPlan,
        remote: &[RemoteRecordSummary],
        local: &[LocalEntry],
        policy: UpdatePolicy,
    ) -> Decision {
        let mut decision = Decision::default();

        let mut by_key: BTreeMap<&str, &LocalEntry> = BTreeMap::new();
        let mut sorted: Vec<&LocalEntry> = local.iter().collect();
        sorted.sort_by_key(|entry| entry.id);
        for entry in sorted {
            if entry.identity_key.is_empty() {
                continue;
            }
            if let Some(kept) = by_key.get(entry.identity_key.as_str()) {
                warn!(
                    collection = %collection,
                    identity_key = %entry.identity_key,
                    kept_entry_id = %kept.id,
                    duplicate_entry_id = %entry.id,
                    "Multiple local entries share an identity key"
                );
                decision.duplicates += 1;
                continue;
            }
            by_key.insert(entry.identity_key.as_str(), entry);
        }

        let summaries: HashMap<&str, &RemoteRecordSummary> =
            remote.iter().map(|s| (s.id.as_str(), s)).collect();

        for remote_id in &plan.missing {
            decision.actions.push(SyncAction::Create {
                remote_id: remote_id.clone(),
            });
        }

        for remote_id in &plan.updating {
            let Some(entry) = by_key.get(remote_id.as_str()) else {
                continue;
            };
            let remote_updated = summaries
                .get(remote_id.as_str())
                .and_then(|s| s.last_updated());

            // Disabling bumps date_updated, so a disabled entry never looks stale.
            if !entry.enabled || policy.should_update(remote_updated, entry.date_updated) {
                decision.actions.push(SyncAction::Update {
                    remote_id: remote_id.clone(),
                    entry_id: entry.id,
                });
            } else {
                debug!(
                    collection = %collection,
                    remote_id = %remote_id,
                    entry_id = %entry.id,
                    "Local entry is up to date"
                );
                decision.updates_skipped += 1;
            }
        }

        for entry in local {
            if entry.enabled && plan.removed.contains(&entry.identity_key) {
                decision.actions.push(SyncAction::Disable { entry_id: entry.id });
            }
        }

        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldSet;
    use crate::ids::{EntryTypeId, SectionId};
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap()
    }

    fn local(id: u64, key: &str, enabled: bool, updated: Option<DateTime<Utc>>) -> LocalEntry {
        LocalEntry {
            id: EntryId::new(id),
            section: SectionId::new(1),
            entry_type: EntryTypeId::new(11),
            identity_key: key.to_string(),
            enabled,
            title: format!("Entry {id}"),
            date_updated: updated,
            post_date: None,
            expiry_date: None,
            fields: FieldSet::new(),
        }
    }

    fn summary(id: &str, last_updated: Option<&str>) -> RemoteRecordSummary {
        match last_updated {
            Some(ts) => RemoteRecordSummary::new(id, json!({"id": id, "last_updated": ts})),
            None => RemoteRecordSummary::new(id, json!({"id": id})),
        }
    }

    fn decide(
        remote: &[RemoteRecordSummary],
        local: &[LocalEntry],
        policy: UpdatePolicy,
    ) -> Decision {
        let plan = ReconciliationPlan::compute(
            remote.iter().map(|s| s.id.clone()),
            local.iter().map(|e| e.identity_key.clone()),
        );
        Reconciler::decide(Collection::Churches, &plan, remote, local, policy)
    }

    #[test]
    fn test_create_update_disable() {
        let remote = [summary("A", None), summary("B", None)];
        let locals = [local(1, "A", true, Some(at(1))), local(2, "C", true, Some(at(1)))];

        let decision = decide(&remote, &locals, UpdatePolicy::Always);
        assert_eq!(
            decision.actions,
            vec![
                SyncAction::Create {
                    remote_id: "B".to_string()
                },
                SyncAction::Update {
                    remote_id: "A".to_string(),
                    entry_id: EntryId::new(1)
                },
                SyncAction::Disable {
                    entry_id: EntryId::new(2)
                },
            ]
        );
    }

    #[test]
    fn test_equal_timestamps_skip_update() {
        let remote = [summary("A", Some("2024-03-01 12:00:00"))];
        let locals = [local(1, "A", true, Some(at(1)))];

        let decision = decide(&remote, &locals, UpdatePolicy::WhenRemoteNewer);
        assert!(decision.actions.is_empty());
        assert_eq!(decision.updates_skipped, 1);
    }

    #[test]
    fn test_newer_remote_updates() {
        let remote = [summary("A", Some("2024-03-02 12:00:00"))];
        let locals = [local(1, "A", true, Some(at(1)))];

        let decision = decide(&remote, &locals, UpdatePolicy::WhenRemoteNewer);
        assert_eq!(decision.actions.len(), 1);
        assert_eq!(decision.actions[0].kind(), "update");
    }

    #[test]
    fn test_missing_remote_timestamp_updates() {
        let remote = [summary("A", None)];
        let locals = [local(1, "A", true, Some(at(1)))];

        let decision = decide(&remote, &locals, UpdatePolicy::WhenRemoteNewer);
        assert_eq!(decision.actions.len(), 1);
    }

    #[test]
    fn test_already_disabled_not_disabled_again() {
        let remote = [summary("A", None)];
        let locals = [local(1, "A", true, None), local(2, "Z", false, None)];

        let decision = decide(&remote, &locals, UpdatePolicy::Always);
        assert!(decision
            .actions
            .iter()
            .all(|a| !matches!(a, SyncAction::Disable { .. })));
    }

    #[test]
    fn test_empty_key_entries_disabled() {
        let remote = [summary("A", None)];
        let locals = [
            local(1, "A", true, None),
            local(2, "", true, None),
            local(3, "", true, None),
        ];

        let decision = decide(&remote, &locals, UpdatePolicy::Always);
        let disabled: Vec<EntryId> = decision
            .actions
            .iter()
            .filter_map(|a| match a {
                SyncAction::Disable { entry_id } => Some(*entry_id),
                _ => None,
            })
            .collect();
        assert_eq!(disabled, vec![EntryId::new(2), EntryId::new(3)]);
    }

    #[test]
    fn test_duplicate_keys_update_lowest_id() {
        let remote = [summary("A", None)];
        let locals = [local(9, "A", true, None), local(4, "A", true, None)];

        let decision = decide(&remote, &locals, UpdatePolicy::Always);
        assert_eq!(decision.duplicates, 1);
        assert_eq!(
            decision.actions,
            vec![SyncAction::Update {
                remote_id: "A".to_string(),
                entry_id: EntryId::new(4)
            }]
        );
    }

    #[test]
    fn test_disabled_local_still_updated() {
        let remote = [summary("A", None)];
        let locals = [local(1, "A", false, Some(at(1)))];

        let decision = decide(&remote, &locals, UpdatePolicy::Always);
        assert_eq!(decision.actions[0].kind(), "update");
    }

    #[test]
    fn test_disabled_local_updated_despite_newer_local_timestamp() {
        let remote = [summary("A", Some("2024-03-01 12:00:00"))];
        let locals = [local(1, "A", false, Some(at(2)))];

        let decision = decide(&remote, &locals, UpdatePolicy::WhenRemoteNewer);
        assert_eq!(
            decision.actions,
            vec![SyncAction::Update {
                remote_id: "A".to_string(),
                entry_id: EntryId::new(1)
            }]
        );
        assert_eq!(decision.updates_skipped, 0);
    }
}
