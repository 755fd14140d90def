//! Update gating policies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Decides whether a record present on both sides is re-written locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdatePolicy {
    /// Update only when the remote last-modified time is strictly newer than
    /// the local last write. A missing timestamp on either side updates.
    WhenRemoteNewer,
    /// Update every matched record on every run.
    Always,
}

impl UpdatePolicy {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdatePolicy::WhenRemoteNewer => "when_remote_newer",
            UpdatePolicy::Always => "always",
        }
    }

    /// Apply the policy to a remote/local timestamp pair.
    #[must_use]
    pub fn should_update(
        &self,
        remote_updated: Option<DateTime<Utc>>,
        local_updated: Option<DateTime<Utc>>,
    ) -> bool {
        match self {
            UpdatePolicy::Always => true,
            UpdatePolicy::WhenRemoteNewer => match (remote_updated, local_updated) {
                (Some(remote), Some(local)) => remote > local,
                _ => true,
            },
        }
    }
}

impl std::fmt::Display for UpdatePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for UpdatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "when_remote_newer" | "newer" => Ok(UpdatePolicy::WhenRemoteNewer),
            "always" => Ok(UpdatePolicy::Always),
            _ => Err(format!("Unknown update policy: {s}")),
        }
    }
}
