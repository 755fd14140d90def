//! Field mapper.
//!
//! Flattens typed remote documents into the field sets stored on local
//! entries. Every optional remote attribute maps to an empty string or an
//! empty list when absent.
//!
//! Jobs need two store lookups while mapping: the parent church entry
//! (by `gatheringId`) and the category links of the configured group, which
//! are created on first reference.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, warn};

use solidrock_connector::record::{
    GatheringRecord, Image, Images, JobCategoryRef, JobRecord, RemoteRecordDetail, Service,
};
use solidrock_connector::types::{parse_remote_timestamp, Collection};

use crate::error::{SyncError, SyncResult};
use crate::fields::{Block, FieldSet, FieldValue, MappedEntry};
use crate::ids::{CategoryGroupId, EntryId, SectionId};
use crate::settings::Settings;
use crate::store::LocalStore;

/// Why a record is being mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapPurpose {
    /// The entry is about to be created.
    Create,
    /// An existing entry is being rewritten.
    Update,
}

fn put(fields: &mut FieldSet, handle: &str, value: FieldValue) {
    fields.insert(handle.to_string(), value);
}

fn put_text(fields: &mut FieldSet, handle: &str, value: Option<&str>) {
    put(fields, handle, FieldValue::text_or_empty(value));
}

fn compose_time(hour: Option<&str>, minute: Option<&str>) -> String {
    match (hour, minute) {
        (Some(hour), Some(minute)) => format!("{hour}:{minute}"),
        _ => String::new(),
    }
}

fn first_src(images: &[Image]) -> Option<&str> {
    images.first().and_then(|image| image.file_src.as_deref())
}

fn gallery_rows(images: &Images) -> Vec<FieldSet> {
    images
        .small
        .iter()
        .filter(|image| !image.is_logo())
        .map(|image| {
            let mut row = FieldSet::new();
            put_text(&mut row, "col1", image.file_src.as_deref());
            row
        })
        .collect()
}

fn service_blocks(services: &[Service]) -> Vec<Block> {
    services
        .iter()
        .enumerate()
        .map(|(index, service)| {
            let mut fields = FieldSet::new();
            put_text(&mut fields, "serviceId", service.id.as_deref());
            put_text(&mut fields, "serviceName", service.name.as_deref());
            put_text(&mut fields, "serviceFrequency", service.frequency.as_deref());
            put_text(&mut fields, "serviceDay", service.day.as_deref());
            put(
                &mut fields,
                "serviceStartTime",
                FieldValue::Text(compose_time(
                    service.start_time_hour.as_deref(),
                    service.start_time_minute.as_deref(),
                )),
            );
            put(
                &mut fields,
                "serviceEndTime",
                FieldValue::Text(compose_time(
                    service.end_time_hour.as_deref(),
                    service.end_time_minute.as_deref(),
                )),
            );
            put(
                &mut fields,
                "serviceIsPrimaryService",
                FieldValue::yes_flag(service.is_primary_service.as_deref()),
            );
            put_text(&mut fields, "serviceAddressLine1", service.address_line_1.as_deref());
            put_text(&mut fields, "serviceAddressLine2", service.address_line_2.as_deref());
            put_text(&mut fields, "serviceCity", service.city.as_deref());
            put_text(&mut fields, "serviceCounty", service.county.as_deref());
            put_text(&mut fields, "servicePostcode", service.postcode.as_deref());
            put_text(&mut fields, "serviceCountry", service.country.as_deref());
            put_text(&mut fields, "serviceLatitude", service.lat.as_deref());
            put_text(&mut fields, "serviceLongitude", service.lng.as_deref());

            Block {
                key: format!("new{}", index + 1),
                block_type: "service".to_string(),
                fields,
            }
        })
        .collect()
}

fn parse_date(value: Option<&str>) -> Option<DateTime<Utc>> {
    value.and_then(parse_remote_timestamp)
}

/// Maps remote documents to local entries.
pub struct FieldMapper {
    store: Arc<dyn LocalStore>,
    churches_section: SectionId,
    category_group: CategoryGroupId,
}

impl FieldMapper {
    /// Create a mapper.
    pub fn new(
        store: Arc<dyn LocalStore>,
        churches_section: SectionId,
        category_group: CategoryGroupId,
    ) -> Self {
        Self {
            store,
            churches_section,
            category_group,
        }
    }

    /// Create a mapper from validated settings.
    pub fn from_settings(store: Arc<dyn LocalStore>, settings: &Settings) -> SyncResult<Self> {
        let churches = settings.target(Collection::Churches)?;
        let group = settings.category_group()?;
        Ok(Self::new(store, churches.section, group))
    }

    /// Map a detail document of either collection.
    pub async fn map(
        &self,
        remote_id: &str,
        detail: &RemoteRecordDetail,
        purpose: MapPurpose,
        now: DateTime<Utc>,
    ) -> SyncResult<MappedEntry> {
        match detail {
            RemoteRecordDetail::Gathering(record) => {
                Self::map_gathering(remote_id, record, purpose, now)
            }
            RemoteRecordDetail::Job(record) => self.map_job(remote_id, record).await,
        }
    }

    /// Map a gathering. Pure: gatherings need no store lookups.
    ///
    /// The post date is `now` on create and left untouched on update.
    pub fn map_gathering(
        remote_id: &str,
        record: &GatheringRecord,
        purpose: MapPurpose,
        now: DateTime<Utc>,
    ) -> SyncResult<MappedEntry> {
        let gathering = record.gathering.as_ref().ok_or_else(|| {
            SyncError::mapping(Collection::Churches, remote_id, "record has no gathering object")
        })?;
        let address = record.address.clone().unwrap_or_default();
        let social = record.social.clone().unwrap_or_default();
        let images = record.images.clone().unwrap_or_default();

        let mut fields = FieldSet::new();

        // Basic
        put(
            &mut fields,
            "gatheringId",
            FieldValue::text(gathering.id.as_deref().unwrap_or(remote_id)),
        );
        put_text(&mut fields, "gatheringChurchId", gathering.church_id.as_deref());
        put_text(&mut fields, "gatheringChurchName", gathering.church_name.as_deref());
        put_text(&mut fields, "gatheringIntro", gathering.profile_intro_text.as_deref());
        put_text(&mut fields, "gatheringDescription", gathering.description.as_deref());
        put_text(&mut fields, "gatheringAdditionalInfo", gathering.additional_info.as_deref());
        put_text(&mut fields, "gatheringWebsiteUrl", gathering.website_url.as_deref());
        put_text(&mut fields, "gatheringEmailAddress", gathering.office_email_address.as_deref());
        put_text(&mut fields, "gatheringTelephoneNumber", gathering.office_tel_number.as_deref());

        // Address
        put_text(&mut fields, "gatheringAddressLine1", address.address_line_1.as_deref());
        put_text(&mut fields, "gatheringAddressLine2", address.address_line_2.as_deref());
        put_text(&mut fields, "gatheringCity", address.city.as_deref());
        put_text(&mut fields, "gatheringCounty", address.county.as_deref());
        put_text(&mut fields, "gatheringPostcode", address.postcode.as_deref());
        put_text(&mut fields, "gatheringCountry", address.country.as_deref());
        put_text(&mut fields, "gatheringLatitude", address.lat.as_deref());
        put_text(&mut fields, "gatheringLongitude", address.lng.as_deref());

        // Social
        put_text(&mut fields, "gatheringFacebookUrl", social.facebook_page_url.as_deref());
        put_text(&mut fields, "gatheringTwitterUrl", social.twitter_profile_url.as_deref());
        put_text(&mut fields, "gatheringLinkedinUrl", social.linkedin_profile_url.as_deref());
        put_text(&mut fields, "gatheringVimeoUrl", social.vimeo_url.as_deref());
        put_text(&mut fields, "gatheringYoutubeUrl", social.youtube_url.as_deref());
        put_text(&mut fields, "gatheringItunesUrl", social.itunes_rss_url.as_deref());

        // Images
        put_text(&mut fields, "gatheringLogoUrl", first_src(&images.logo));
        put_text(&mut fields, "gatheringCoverImageUrl", first_src(&images.cover));
        put(&mut fields, "gatheringImages", FieldValue::Rows(gallery_rows(&images)));

        // Services
        put(
            &mut fields,
            "gatheringServices",
            FieldValue::Blocks(service_blocks(&record.services)),
        );

        Ok(MappedEntry {
            title: gathering.name.clone().unwrap_or_default(),
            enabled: gathering.is_enabled(),
            fields,
            post_date: match purpose {
                MapPurpose::Create => Some(now),
                MapPurpose::Update => None,
            },
            expiry_date: None,
        })
    }

    /// Map a job, resolving its church and categories against the store.
    pub async fn map_job(&self, remote_id: &str, record: &JobRecord) -> SyncResult<MappedEntry> {
        let job = record.job.as_ref().ok_or_else(|| {
            SyncError::mapping(Collection::Jobs, remote_id, "record has no job object")
        })?;

        let church = self.resolve_church(job.gathering_id.as_deref()).await?;
        let categories = self
            .resolve_categories(remote_id, &record.job_categories)
            .await?;

        let mut fields = FieldSet::new();
        put(
            &mut fields,
            "jobId",
            FieldValue::text(job.id.as_deref().unwrap_or(remote_id)),
        );
        put(&mut fields, "jobChurchGathering", FieldValue::Relations(church));
        put(&mut fields, "jobCategories", FieldValue::Relations(categories));
        put_text(&mut fields, "jobReference", job.reference_code.as_deref());
        put_text(&mut fields, "jobType", job.job_type.as_deref());
        put_text(&mut fields, "jobContractLength", job.contract_length.as_deref());
        put_text(&mut fields, "jobSalary", job.salary.as_deref());
        put_text(&mut fields, "jobDescription", job.description.as_deref());
        put_text(&mut fields, "jobQualitiesGifts", job.required_skills.as_deref());
        put(
            &mut fields,
            "jobRightToWorkInUk",
            FieldValue::yes_flag(job.right_to_work_in_uk.as_deref()),
        );
        put(
            &mut fields,
            "jobAcceptanceOfFiecDoctrinalBasis",
            FieldValue::yes_flag(job.acceptance_of_fiec_doctrinal_basis.as_deref()),
        );
        put(
            &mut fields,
            "jobAgreementWithFiecEthosStatements",
            FieldValue::yes_flag(job.agreement_with_fiec_ethos_statements.as_deref()),
        );
        put_text(&mut fields, "jobContactName", job.contact_name.as_deref());
        put_text(&mut fields, "jobContactPosition", job.contact_position.as_deref());
        put_text(&mut fields, "jobContactEmailAddress", job.contact_email_address.as_deref());
        put_text(&mut fields, "jobContactTelephoneNumber", job.contact_tel_number.as_deref());
        put_text(&mut fields, "jobOpportunitiesProblems", job.opportunities_problems.as_deref());
        put_text(&mut fields, "jobHousingFinancialSupport", job.housing_financial_support.as_deref());
        put_text(&mut fields, "jobPastoralResponsibilities", job.pastoral_responsibilities.as_deref());
        put_text(&mut fields, "jobAdditionalInfo", job.additional_info.as_deref());

        Ok(MappedEntry {
            title: job.title.clone().unwrap_or_default(),
            enabled: job.is_enabled(),
            fields,
            post_date: parse_date(job.date_listing_posted.as_deref()),
            expiry_date: parse_date(job.date_listing_expires.as_deref()),
        })
    }

    /// Local church entry of a job's parent gathering, as a relation list.
    async fn resolve_church(&self, gathering_id: Option<&str>) -> SyncResult<Vec<EntryId>> {
        let Some(gathering_id) = gathering_id.filter(|id| !id.is_empty()) else {
            return Ok(Vec::new());
        };

        let church = self
            .store
            .find_by_identity(
                self.churches_section,
                Collection::Churches.identity_field(),
                gathering_id,
            )
            .await?;

        match church {
            Some(entry) => Ok(vec![entry.id]),
            None => {
                debug!(gathering_id = gathering_id, "No local church for job gathering");
                Ok(Vec::new())
            }
        }
    }

    /// Local category ids for a job's category references, creating links
    /// for ids not seen before.
    async fn resolve_categories(
        &self,
        remote_id: &str,
        refs: &[JobCategoryRef],
    ) -> SyncResult<Vec<EntryId>> {
        if refs.is_empty() {
            return Ok(Vec::new());
        }

        // External id to lowest local id.
        let mut known: BTreeMap<String, EntryId> = BTreeMap::new();
        for link in self.store.list_categories(self.category_group).await? {
            known
                .entry(link.external_id)
                .and_modify(|id| *id = (*id).min(link.id))
                .or_insert(link.id);
        }

        let mut resolved = Vec::with_capacity(refs.len());
        for category in refs {
            let Some(external_id) = category.id.as_deref().filter(|id| !id.is_empty()) else {
                warn!(job_id = remote_id, "Skipping job category without id");
                continue;
            };

            let id = match known.get(external_id) {
                Some(id) => *id,
                None => {
                    let title = category.title.as_deref().unwrap_or_default();
                    let id = self
                        .store
                        .create_category(self.category_group, title, external_id)
                        .await
                        .map_err(|e| {
                            error!(title = title, error = %e, "Couldn't save the category");
                            SyncError::mapping(
                                Collection::Jobs,
                                remote_id,
                                format!("couldn't save the category \"{title}\": {e}"),
                            )
                        })?;
                    debug!(category_id = %id, external_id = external_id, "Created job category");
                    known.insert(external_id.to_string(), id);
                    id
                }
            };

            if !resolved.contains(&id) {
                resolved.push(id);
            }
        }

        Ok(resolved)
    }
}
