//! Typed detail documents returned by the detail endpoints.
//!
//! The remote API is loosely typed: ids arrive as numbers or strings,
//! missing sub-objects arrive as `null`, `false` or `[]`. Every attribute is
//! therefore an `Option`, every list defaults to empty, and scalar values are
//! decoded leniently into strings.

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};

use crate::types::Collection;

/// Convert a loosely-typed scalar into a string.
///
/// Arrays, objects and `null` have no string form.
#[must_use]
pub fn value_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(true) => Some("1".to_string()),
        serde_json::Value::Bool(false) => Some("0".to_string()),
        _ => None,
    }
}

fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value_to_string(&value))
}

fn loose_object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if !value.is_object() {
        return Ok(None);
    }
    serde_json::from_value(value)
        .map(Some)
        .map_err(serde::de::Error::custom)
}

fn loose_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(serde::de::Error::custom))
            .collect(),
        _ => Ok(Vec::new()),
    }
}

/// Core attributes of a church gathering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Gathering {
    #[serde(default, deserialize_with = "loose_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub status_id: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub church_id: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub church_name: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub profile_intro_text: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub additional_info: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub website_url: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub office_email_address: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub office_tel_number: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub last_updated: Option<String>,
}

impl Gathering {
    /// A gathering is live only with status code `1`.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.status_id.as_deref() == Some("1")
    }
}

/// Postal address with coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default, deserialize_with = "loose_string")]
    pub address_line_1: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub address_line_2: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub county: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub postcode: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub lat: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub lng: Option<String>,
}

/// Social profile links.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Social {
    #[serde(default, deserialize_with = "loose_string")]
    pub facebook_page_url: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub twitter_profile_url: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub linkedin_profile_url: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub vimeo_url: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub youtube_url: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub itunes_rss_url: Option<String>,
}

/// A single uploaded image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Image {
    #[serde(default, deserialize_with = "loose_string")]
    pub file_src: Option<String>,
    /// `"y"` when the image is a logo.
    #[serde(default, deserialize_with = "loose_string")]
    pub is_logo: Option<String>,
}

impl Image {
    /// Check the logo flag.
    #[must_use]
    pub fn is_logo(&self) -> bool {
        self.is_logo.as_deref() == Some("y")
    }
}

/// Classified image lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Images {
    #[serde(default, deserialize_with = "loose_list")]
    pub logo: Vec<Image>,
    #[serde(default, deserialize_with = "loose_list")]
    pub cover: Vec<Image>,
    /// Gallery images; may contain logos that must be filtered out.
    #[serde(default, deserialize_with = "loose_list")]
    pub small: Vec<Image>,
}

/// A scheduled service of a gathering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Service {
    #[serde(default, deserialize_with = "loose_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub frequency: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub day: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub start_time_hour: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub start_time_minute: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub end_time_hour: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub end_time_minute: Option<String>,
    /// `"y"` for the primary service.
    #[serde(default, deserialize_with = "loose_string")]
    pub is_primary_service: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub address_line_1: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub address_line_2: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub county: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub postcode: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub lat: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub lng: Option<String>,
}

/// Full detail document of one gathering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatheringRecord {
    #[serde(default, deserialize_with = "loose_object")]
    pub gathering: Option<Gathering>,
    #[serde(default, deserialize_with = "loose_object")]
    pub address: Option<Address>,
    #[serde(default, deserialize_with = "loose_object")]
    pub social: Option<Social>,
    #[serde(default, deserialize_with = "loose_list")]
    pub services: Vec<Service>,
    #[serde(default, deserialize_with = "loose_object")]
    pub images: Option<Images>,
}

/// Core attributes of a job posting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(default, deserialize_with = "loose_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub title: Option<String>,
    /// Identity key of the parent gathering.
    #[serde(default, deserialize_with = "loose_string")]
    pub gathering_id: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub reference_code: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "loose_string")]
    pub job_type: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub contract_length: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub salary: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub required_skills: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub right_to_work_in_uk: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub acceptance_of_fiec_doctrinal_basis: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub agreement_with_fiec_ethos_statements: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub contact_name: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub contact_position: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub contact_email_address: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub contact_tel_number: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub opportunities_problems: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub housing_financial_support: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub pastoral_responsibilities: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub additional_info: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub date_listing_posted: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub date_listing_expires: Option<String>,
}

impl Job {
    /// A job is live only with status `public`.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.status.as_deref() == Some("public")
    }
}

/// Category reference attached to a job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobCategoryRef {
    #[serde(default, deserialize_with = "loose_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub title: Option<String>,
}

/// Full detail document of one job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    #[serde(default, deserialize_with = "loose_object")]
    pub job: Option<Job>,
    #[serde(default, deserialize_with = "loose_list")]
    pub job_categories: Vec<JobCategoryRef>,
}

/// Detail document of either collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "collection", rename_all = "snake_case")]
pub enum RemoteRecordDetail {
    Gathering(GatheringRecord),
    Job(JobRecord),
}

impl RemoteRecordDetail {
    /// Decode a detail response body.
    ///
    /// Returns `Ok(None)` when the body does not carry the collection's core
    /// object.
    pub fn from_body(
        collection: Collection,
        body: serde_json::Value,
    ) -> Result<Option<Self>, serde_json::Error> {
        let has_core = body
            .get(collection.detail_key())
            .is_some_and(serde_json::Value::is_object);
        if !has_core {
            return Ok(None);
        }

        let detail = match collection {
            Collection::Churches => RemoteRecordDetail::Gathering(serde_json::from_value(body)?),
            Collection::Jobs => RemoteRecordDetail::Job(serde_json::from_value(body)?),
        };
        Ok(Some(detail))
    }

    /// Collection this document belongs to.
    #[must_use]
    pub fn collection(&self) -> Collection {
        match self {
            RemoteRecordDetail::Gathering(_) => Collection::Churches,
            RemoteRecordDetail::Job(_) => Collection::Jobs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_gathering_record_lenient_scalars() {
        let record: GatheringRecord = serde_json::from_value(json!({
            "gathering": {"id": 12, "status_id": 1, "name": "Grace Church"},
            "services": [{"start_time_hour": 9, "start_time_minute": "0"}]
        }))
        .unwrap();

        let gathering = record.gathering.unwrap();
        assert_eq!(gathering.id.as_deref(), Some("12"));
        assert!(gathering.is_enabled());
        assert_eq!(record.services[0].start_time_hour.as_deref(), Some("9"));
        assert!(record.address.is_none());
        assert!(record.images.is_none());
    }

    #[test]
    fn test_missing_sub_objects_in_php_shapes() {
        let record: GatheringRecord = serde_json::from_value(json!({
            "gathering": {"id": "1"},
            "address": false,
            "social": [],
            "services": null,
            "images": {"logo": [], "cover": null}
        }))
        .unwrap();

        assert!(record.address.is_none());
        assert!(record.social.is_none());
        assert!(record.services.is_empty());
        let images = record.images.unwrap();
        assert!(images.logo.is_empty());
        assert!(images.cover.is_empty());
        assert!(images.small.is_empty());
    }

    #[test]
    fn test_enabled_rules_are_exact() {
        let g = Gathering {
            status_id: Some("2".to_string()),
            ..Default::default()
        };
        assert!(!g.is_enabled());
        assert!(!Gathering::default().is_enabled());

        let j = Job {
            status: Some("Public".to_string()),
            ..Default::default()
        };
        assert!(!j.is_enabled());
        let j = Job {
            status: Some("public".to_string()),
            ..Default::default()
        };
        assert!(j.is_enabled());
    }

    #[test]
    fn test_job_record_type_rename() {
        let record: JobRecord = serde_json::from_value(json!({
            "job": {"id": "5", "type": "Full time"},
            "job_categories": [{"id": 42, "title": "Pastoral"}]
        }))
        .unwrap();
        assert_eq!(record.job.unwrap().job_type.as_deref(), Some("Full time"));
        assert_eq!(record.job_categories[0].id.as_deref(), Some("42"));
    }

    #[test]
    fn test_from_body_without_core_object() {
        let detail = RemoteRecordDetail::from_body(Collection::Jobs, json!({"error": "nope"}));
        assert!(detail.unwrap().is_none());

        let detail = RemoteRecordDetail::from_body(Collection::Churches, json!({"gathering": null}));
        assert!(detail.unwrap().is_none());
    }

    #[test]
    fn test_from_body_dispatches_on_collection() {
        let detail = RemoteRecordDetail::from_body(
            Collection::Churches,
            json!({"gathering": {"id": "3", "name": "Hope"}}),
        )
        .unwrap()
        .unwrap();
        assert_eq!(detail.collection(), Collection::Churches);
    }

    #[test]
    fn test_image_logo_flag() {
        let logo = Image {
            file_src: Some("a.png".to_string()),
            is_logo: Some("y".to_string()),
        };
        assert!(logo.is_logo());
        assert!(!Image::default().is_logo());
    }
}
