//! Enrichment executor: drives a single job through one provider call and
//! persists the accepted field groups.

use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveTime;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use scholarsync_core::{
    defaults, EnrichedData, EnrichedFieldUpdate, EnrichmentProvider, Error, JobStore, Result,
};

/// Drives one job through the provider call and maps the output into
/// persisted fields under the per-group confidence gates.
///
/// Writes only to the store; queue transitions stay with the caller (the
/// runner marks enriched/failed based on the returned result).
pub struct EnrichmentExecutor<S: ?Sized, P: ?Sized> {
    store: Arc<S>,
    provider: Arc<P>,
}

impl<S, P> EnrichmentExecutor<S, P>
where
    S: JobStore + ?Sized,
    P: EnrichmentProvider + ?Sized,
{
    pub fn new(store: Arc<S>, provider: Arc<P>) -> Self {
        Self { store, provider }
    }

    /// Enrich a single job end to end.
    ///
    /// Every failure is wrapped as [`Error::Enrichment`] naming the failing
    /// operation, so the runner records a message an operator can act on.
    #[instrument(skip(self), fields(subsystem = "pipeline", component = "executor", op = "enrich_one", job_id = %job_id, provider = self.provider.name()))]
    pub async fn enrich_one(&self, job_id: Uuid) -> Result<()> {
        let start = Instant::now();

        let text = self
            .store
            .job_text(job_id)
            .await
            .map_err(|e| Error::enrichment(job_id, "load_text", e))?;
        if text.is_empty() {
            return Err(Error::enrichment(job_id, "load_text", "no usable text"));
        }

        let data = self
            .provider
            .enrich_job(&text)
            .await
            .map_err(|e| Error::enrichment(job_id, "provider_call", e))?;

        let update = apply_confidence_gates(&data);
        if update.is_empty() {
            // Valid provider output, just nothing confident enough to keep.
            debug!("No group met its confidence threshold");
            return Ok(());
        }

        self.store
            .update_enrichment_fields(job_id, update)
            .await
            .map_err(|e| Error::enrichment(job_id, "persist_fields", e))?;

        info!(
            duration_ms = start.elapsed().as_millis() as u64,
            "Job enriched"
        );
        Ok(())
    }
}

/// Map provider output into a partial field update, accepting each group
/// only when its confidence meets the per-group threshold. Below-threshold
/// groups stay out of the update entirely, so their stored values are never
/// overwritten.
pub fn apply_confidence_gates(data: &EnrichedData) -> EnrichedFieldUpdate {
    let mut update = EnrichedFieldUpdate::default();

    if let Some(group) = &data.keywords {
        if group.confidence >= defaults::CONFIDENCE_CORE && !group.keywords.is_empty() {
            update.keywords = Some(group.keywords.clone());
        }
    }

    if let Some(group) = &data.attributes {
        if group.confidence >= defaults::CONFIDENCE_CORE {
            update.category = clean(group.category.as_deref());
            update.work_modality = group.work_modality;
            update.contract_type = group.contract_type;
            update.employment_type = group.employment_type;
        }
    }

    if let Some(group) = &data.details {
        if group.confidence >= defaults::CONFIDENCE_SPECULATIVE {
            update.summary = clean(group.summary.as_deref());
            update.department = clean(group.department.as_deref());
            update.duration = clean(group.duration.as_deref());
        }
    }

    if let Some(group) = &data.application {
        if group.confidence >= defaults::CONFIDENCE_SPECULATIVE {
            update.deadline_at = group
                .deadline
                .map(|d| d.and_time(NaiveTime::MIN).and_utc());
            update.application_url = clean(group.url.as_deref());
            update.application_instructions = clean(group.instructions.as_deref());
        }
    }

    if let Some(group) = &data.languages {
        if group.confidence >= defaults::CONFIDENCE_SPECULATIVE && !group.languages.is_empty() {
            update.languages = Some(group.languages.clone());
        }
    }

    if let Some(group) = &data.background {
        if group.confidence >= defaults::CONFIDENCE_SPECULATIVE {
            update.education_level = clean(group.education_level.as_deref());
            update.field_of_study = clean(group.field_of_study.as_deref());
            update.experience_years = group.experience_years.filter(|y| *y >= 0);
        }
    }

    if let Some(group) = &data.geolocation {
        if group.confidence >= defaults::CONFIDENCE_SPECULATIVE {
            update.city = clean(group.city.as_deref());
            update.region = clean(group.region.as_deref());
            update.country = clean(group.country.as_deref());
            update.latitude = group.latitude.filter(|v| (-90.0..=90.0).contains(v));
            update.longitude = group.longitude.filter(|v| (-180.0..=180.0).contains(v));
        }
    }

    if let Some(group) = &data.contact {
        if group.confidence >= defaults::CONFIDENCE_SPECULATIVE {
            update.contact_name = clean(group.name.as_deref());
            update.contact_email = clean(group.email.as_deref());
            update.contact_phone = clean(group.phone.as_deref());
        }
    }

    if let Some(group) = &data.research_areas {
        if group.confidence >= defaults::CONFIDENCE_SPECULATIVE
            && !group.research_areas.is_empty()
        {
            update.research_areas = Some(group.research_areas.clone());
        }
    }

    update
}

/// Trim a provider string, dropping it entirely when empty.
fn clean(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
