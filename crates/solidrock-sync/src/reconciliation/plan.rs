//! Three-way diff of remote and local identity keys.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Partition of identity keys for one sync run.
///
/// `missing` and `updating` partition the remote keys; `removed` holds the
/// local keys absent remotely. Keys are compared by exact string equality
/// and inputs are deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationPlan {
    /// Remote keys with no local counterpart.
    pub missing: BTreeSet<String>,
    /// Local keys with no remote counterpart.
    pub removed: BTreeSet<String>,
    /// Remote keys that also exist locally.
    pub updating: BTreeSet<String>,
}

impl ReconciliationPlan {
    /// Compute the plan.
    pub fn compute<R, L>(remote_ids: R, local_ids: L) -> Self
    where
        R: IntoIterator,
        R::Item: Into<String>,
        L: IntoIterator,
        L::Item: Into<String>,
    {
        let remote: BTreeSet<String> = remote_ids.into_iter().map(Into::into).collect();
        let local: BTreeSet<String> = local_ids.into_iter().map(Into::into).collect();

        let missing: BTreeSet<String> = remote.difference(&local).cloned().collect();
        let removed: BTreeSet<String> = local.difference(&remote).cloned().collect();
        let updating: BTreeSet<String> = remote.difference(&missing).cloned().collect();

        Self {
            missing,
            removed,
            updating,
        }
    }

    /// Whether the plan contains no keys at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.removed.is_empty() && self.updating.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_basic_partition() {
        let plan = ReconciliationPlan::compute(["A", "B"], ["A", "C"]);
        assert_eq!(plan.missing, set(&["B"]));
        assert_eq!(plan.updating, set(&["A"]));
        assert_eq!(plan.removed, set(&["C"]));
    }

    #[test]
    fn test_duplicates_are_collapsed() {
        let plan = ReconciliationPlan::compute(["A", "A", "B", "B"], ["B", "B"]);
        assert_eq!(plan.missing, set(&["A"]));
        assert_eq!(plan.updating, set(&["B"]));
        assert!(plan.removed.is_empty());
    }

    #[test]
    fn test_empty_local_key_is_removed() {
        let plan = ReconciliationPlan::compute(["1"], ["", "1"]);
        assert_eq!(plan.removed, set(&[""]));
        assert_eq!(plan.updating, set(&["1"]));
    }

    #[test]
    fn test_empty_inputs() {
        let none: [&str; 0] = [];
        assert!(ReconciliationPlan::compute(none, none).is_empty());

        let plan = ReconciliationPlan::compute(none, ["X"]);
        assert_eq!(plan.removed, set(&["X"]));
    }

    #[test]
    fn test_exact_string_equality() {
        let plan = ReconciliationPlan::compute(["01", "a"], ["1", "A"]);
        assert_eq!(plan.missing, set(&["01", "a"]));
        assert_eq!(plan.removed, set(&["1", "A"]));
    }

    #[test]
    fn test_partition_properties() {
        let cases: Vec<(Vec<&str>, Vec<&str>)> = vec![
            (vec!["1", "2", "3"], vec!["2", "3", "4"]),
            (vec![], vec!["1"]),
            (vec!["1"], vec![]),
            (vec!["x", "y", "x"], vec!["", "y", ""]),
            (vec!["a", "b"], vec!["a", "b"]),
        ];

        for (remote, local) in cases {
            let plan = ReconciliationPlan::compute(remote.clone(), local.clone());
            let r = set(&remote);
            let l = set(&local);

            let expected_missing: BTreeSet<String> = r.difference(&l).cloned().collect();
            let expected_removed: BTreeSet<String> = l.difference(&r).cloned().collect();
            assert_eq!(plan.missing, expected_missing);
            assert_eq!(plan.removed, expected_removed);

            let union: BTreeSet<String> = plan.missing.union(&plan.updating).cloned().collect();
            assert_eq!(union, r);
            assert!(plan.missing.is_disjoint(&plan.updating));
            assert!(plan.missing.is_disjoint(&plan.removed));
            assert!(plan.updating.is_disjoint(&plan.removed));
        }
    }
}
