//! Collection and summary types shared by every remote source.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::value_to_string;

/// One of the two synchronized remote collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    /// Church gatherings (organizations).
    Churches,
    /// Job postings.
    Jobs,
}

impl Collection {
    /// All collections, in sync order.
    pub const ALL: [Collection; 2] = [Collection::Churches, Collection::Jobs];

    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Churches => "churches",
            Collection::Jobs => "jobs",
        }
    }

    /// Endpoint returning every live record of the collection.
    #[must_use]
    pub fn listing_endpoint(&self) -> &'static str {
        match self {
            Collection::Churches => "churches/all_live_gatherings.json",
            Collection::Jobs => "jobs/all_open_jobs.json",
        }
    }

    /// Endpoint returning one full record by id.
    #[must_use]
    pub fn detail_endpoint(&self) -> &'static str {
        match self {
            Collection::Churches => "churches/single_gathering.json",
            Collection::Jobs => "jobs/single_job.json",
        }
    }

    /// Key of the record array in a listing response.
    #[must_use]
    pub fn listing_key(&self) -> &'static str {
        match self {
            Collection::Churches => "gatherings",
            Collection::Jobs => "jobs",
        }
    }

    /// Key of the core object in a detail response.
    #[must_use]
    pub fn detail_key(&self) -> &'static str {
        match self {
            Collection::Churches => "gathering",
            Collection::Jobs => "job",
        }
    }

    /// Local field holding the remote identity key.
    #[must_use]
    pub fn identity_field(&self) -> &'static str {
        match self {
            Collection::Churches => "gatheringId",
            Collection::Jobs => "jobId",
        }
    }

    /// Singular label used in log lines and work descriptions.
    #[must_use]
    pub fn record_label(&self) -> &'static str {
        match self {
            Collection::Churches => "Gathering",
            Collection::Jobs => "Job",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "churches" | "gatherings" => Ok(Collection::Churches),
            "jobs" => Ok(Collection::Jobs),
            _ => Err(format!("Unknown collection: {s}")),
        }
    }
}

/// One item of a listing response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecordSummary {
    /// Stable identity key, unique within one listing.
    pub id: String,
    /// The listing item as returned by the API.
    pub raw: serde_json::Value,
}

impl RemoteRecordSummary {
    /// Create a summary from an id and its raw document.
    pub fn new(id: impl Into<String>, raw: serde_json::Value) -> Self {
        Self { id: id.into(), raw }
    }

    /// Build a summary from a listing item, reading its `id` attribute.
    ///
    /// Returns `None` when the item has no usable id.
    #[must_use]
    pub fn from_raw(raw: serde_json::Value) -> Option<Self> {
        let id = raw.get("id").and_then(value_to_string)?;
        if id.is_empty() {
            return None;
        }
        Some(Self { id, raw })
    }

    /// Remote last-modified timestamp, if the listing carries one.
    #[must_use]
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.raw
            .get("last_updated")
            .and_then(value_to_string)
            .and_then(|s| parse_remote_timestamp(&s))
    }
}

/// Parse a timestamp as the remote API formats them.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` and `YYYY-MM-DD`; naive values are
/// taken as UTC.
#[must_use]
pub fn parse_remote_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_collection_roundtrip() {
        for collection in Collection::ALL {
            let parsed: Collection = collection.as_str().parse().unwrap();
            assert_eq!(collection, parsed);
        }
        assert_eq!("gatherings".parse::<Collection>(), Ok(Collection::Churches));
        assert!("sermons".parse::<Collection>().is_err());
    }

    #[test]
    fn test_collection_endpoints() {
        assert_eq!(
            Collection::Churches.listing_endpoint(),
            "churches/all_live_gatherings.json"
        );
        assert_eq!(Collection::Jobs.detail_endpoint(), "jobs/single_job.json");
        assert_eq!(Collection::Churches.identity_field(), "gatheringId");
        assert_eq!(Collection::Jobs.identity_field(), "jobId");
    }

    #[test]
    fn test_summary_from_raw_numeric_id() {
        let summary = RemoteRecordSummary::from_raw(serde_json::json!({"id": 42})).unwrap();
        assert_eq!(summary.id, "42");
    }

    #[test]
    fn test_summary_from_raw_without_id() {
        assert!(RemoteRecordSummary::from_raw(serde_json::json!({"name": "x"})).is_none());
        assert!(RemoteRecordSummary::from_raw(serde_json::json!({"id": ""})).is_none());
        assert!(RemoteRecordSummary::from_raw(serde_json::json!({"id": null})).is_none());
    }

    #[test]
    fn test_summary_last_updated() {
        let summary = RemoteRecordSummary::new(
            "7",
            serde_json::json!({"id": "7", "last_updated": "2024-03-01 10:30:00"}),
        );
        assert_eq!(
            summary.last_updated(),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap())
        );

        let summary = RemoteRecordSummary::new("8", serde_json::json!({"id": "8"}));
        assert_eq!(summary.last_updated(), None);
    }

    #[test]
    fn test_parse_remote_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2023, 11, 5, 0, 0, 0).unwrap();
        assert_eq!(parse_remote_timestamp("2023-11-05"), Some(expected));
        assert_eq!(
            parse_remote_timestamp("2023-11-05T00:00:00Z"),
            Some(expected)
        );
        assert_eq!(
            parse_remote_timestamp("2023-11-05T01:00:00+01:00"),
            Some(expected)
        );
        assert_eq!(parse_remote_timestamp(""), None);
        assert_eq!(parse_remote_timestamp("next tuesday"), None);
    }
}
