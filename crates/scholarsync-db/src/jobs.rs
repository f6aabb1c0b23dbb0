//! Job posting store implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use scholarsync_core::{
    ContractType, EmploymentType, EnrichedFieldUpdate, EnrichmentProgress, EnrichmentState,
    EnrichmentStatus, Error, JobRecord, JobStatus, JobStatusSummary, JobStore, JobText,
    LanguageRequirement, LoadOutcome, NewJobRecord, Result, WorkModality,
};

/// Compute the SHA-256 content hash over the deterministic text fields of a
/// record. Drives change detection on re-sync: identical hash means nothing
/// to write.
pub fn compute_content_hash(record: &NewJobRecord) -> String {
    let mut hasher = Sha256::new();
    for field in [
        Some(record.title.as_str()),
        Some(record.description.as_str()),
        record.institution.as_deref(),
        record.department.as_deref(),
        record.location.as_deref(),
        record.salary_text.as_deref(),
        record.qualifications.as_deref(),
        record.application_instructions.as_deref(),
        record.application_url.as_deref(),
    ] {
        hasher.update(field.unwrap_or(""));
        hasher.update([0u8]);
    }
    if let Some(posted) = record.posted_at {
        hasher.update(posted.to_rfc3339());
    }
    hasher.update([0u8]);
    if let Some(deadline) = record.deadline_at {
        hasher.update(deadline.to_rfc3339());
    }
    hex::encode(hasher.finalize())
}

/// PostgreSQL implementation of [`JobStore`].
#[derive(Clone)]
pub struct PgJobStore {
    pool: Pool<Postgres>,
}

impl PgJobStore {
    /// Create a new PgJobStore with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Convert JobStatus to string for the database.
    pub(crate) fn job_status_to_str(status: JobStatus) -> &'static str {
        match status {
            JobStatus::Active => "active",
            JobStatus::Expired => "expired",
            JobStatus::Removed => "removed",
        }
    }

    /// Convert string from the database to JobStatus.
    pub(crate) fn str_to_job_status(s: &str) -> JobStatus {
        match s {
            "active" => JobStatus::Active,
            "expired" => JobStatus::Expired,
            "removed" => JobStatus::Removed,
            _ => JobStatus::Removed, // fallback: treat unknown as out of play
        }
    }

    /// Convert EnrichmentStatus to string for the database.
    pub(crate) fn enrichment_status_to_str(status: EnrichmentStatus) -> &'static str {
        match status {
            EnrichmentStatus::Pending => "pending",
            EnrichmentStatus::InProgress => "in_progress",
            EnrichmentStatus::Enriched => "enriched",
            EnrichmentStatus::Failed => "failed",
        }
    }

    /// Convert string from the database to EnrichmentStatus.
    pub(crate) fn str_to_enrichment_status(s: &str) -> EnrichmentStatus {
        match s {
            "pending" => EnrichmentStatus::Pending,
            "in_progress" => EnrichmentStatus::InProgress,
            "enriched" => EnrichmentStatus::Enriched,
            "failed" => EnrichmentStatus::Failed,
            _ => EnrichmentStatus::Pending, // fallback
        }
    }

    /// Columns selected for a full record fetch.
    const RECORD_COLUMNS: &'static str = "id, source_url, title, description_html, description, \
         institution, department, location, salary_text, qualifications, \
         application_instructions, application_url, posted_at, deadline_at, \
         category, work_modality, contract_type, employment_type, keywords, summary, \
         duration, education_level, field_of_study, experience_years, city, region, \
         country, latitude, longitude, contact_name, contact_email, contact_phone, \
         research_areas, status::text AS status, content_hash, \
         enrichment_status::text AS enrichment_status, attempt_count, last_attempt_at, \
         enriched_at, enrichment_error, created_at, updated_at";

    /// Parse a job_posting row into a JobRecord.
    fn parse_record_row(row: sqlx::postgres::PgRow) -> JobRecord {
        let status: String = row.get("status");
        let enrichment_status: String = row.get("enrichment_status");
        JobRecord {
            id: row.get("id"),
            source_url: row.get("source_url"),
            title: row.get("title"),
            description_html: row.get("description_html"),
            description: row.get("description"),
            institution: row.get("institution"),
            department: row.get("department"),
            location: row.get("location"),
            salary_text: row.get("salary_text"),
            qualifications: row.get("qualifications"),
            application_instructions: row.get("application_instructions"),
            application_url: row.get("application_url"),
            posted_at: row.get("posted_at"),
            deadline_at: row.get("deadline_at"),
            category: row.get("category"),
            work_modality: row
                .get::<Option<String>, _>("work_modality")
                .as_deref()
                .and_then(WorkModality::from_str_loose),
            contract_type: row
                .get::<Option<String>, _>("contract_type")
                .as_deref()
                .and_then(ContractType::from_str_loose),
            employment_type: row
                .get::<Option<String>, _>("employment_type")
                .as_deref()
                .and_then(EmploymentType::from_str_loose),
            keywords: row.get("keywords"),
            summary: row.get("summary"),
            duration: row.get("duration"),
            education_level: row.get("education_level"),
            field_of_study: row.get("field_of_study"),
            experience_years: row.get("experience_years"),
            city: row.get("city"),
            region: row.get("region"),
            country: row.get("country"),
            latitude: row.get("latitude"),
            longitude: row.get("longitude"),
            contact_name: row.get("contact_name"),
            contact_email: row.get("contact_email"),
            contact_phone: row.get("contact_phone"),
            research_areas: row.get("research_areas"),
            status: Self::str_to_job_status(&status),
            content_hash: row.get("content_hash"),
            enrichment: EnrichmentState {
                status: Self::str_to_enrichment_status(&enrichment_status),
                attempt_count: row.get("attempt_count"),
                last_attempt_at: row.get("last_attempt_at"),
                enriched_at: row.get("enriched_at"),
                error: row.get("enrichment_error"),
            },
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn insert(&self, record: NewJobRecord) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let hash = compute_content_hash(&record);
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO job_posting (id, source_url, title, description_html, description,
                 institution, department, location, salary_text, qualifications,
                 application_instructions, application_url, work_modality, contract_type,
                 employment_type, posted_at, deadline_at, content_hash, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                     $11, $12, $13, $14, $15, $16, $17, $18, $19, $19)",
        )
        .bind(id)
        .bind(&record.source_url)
        .bind(&record.title)
        .bind(&record.description_html)
        .bind(&record.description)
        .bind(&record.institution)
        .bind(&record.department)
        .bind(&record.location)
        .bind(&record.salary_text)
        .bind(&record.qualifications)
        .bind(&record.application_instructions)
        .bind(&record.application_url)
        .bind(record.work_modality.map(|m| m.to_string()))
        .bind(record.contract_type.map(|c| c.to_string()))
        .bind(record.employment_type.map(|e| e.to_string()))
        .bind(record.posted_at)
        .bind(record.deadline_at)
        .bind(&hash)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(id)
    }

    async fn upsert(&self, record: NewJobRecord) -> Result<LoadOutcome> {
        let hash = compute_content_hash(&record);

        let existing: Option<(Uuid, String)> =
            sqlx::query_as("SELECT id, content_hash FROM job_posting WHERE source_url = $1")
                .bind(&record.source_url)
                .fetch_optional(&self.pool)
                .await
                .map_err(Error::Database)?;

        match existing {
            None => {
                self.insert(record).await?;
                Ok(LoadOutcome::Inserted)
            }
            Some((_, old_hash)) if old_hash == hash => Ok(LoadOutcome::Unchanged),
            Some((id, _)) => {
                // Refresh deterministic fields only. Heuristic prefills use
                // COALESCE so enrichment output is never clobbered by a
                // re-sync; the enrichment sub-state is untouched entirely.
                sqlx::query(
                    "UPDATE job_posting
                     SET title = $1, description_html = $2, description = $3,
                         institution = $4, department = $5, location = $6,
                         salary_text = $7, qualifications = $8,
                         application_instructions = $9,
                         application_url = COALESCE($10, application_url),
                         work_modality = COALESCE(work_modality, $11),
                         contract_type = COALESCE(contract_type, $12),
                         employment_type = COALESCE(employment_type, $13),
                         posted_at = $14, deadline_at = $15,
                         content_hash = $16, updated_at = $17
                     WHERE id = $18",
                )
                .bind(&record.title)
                .bind(&record.description_html)
                .bind(&record.description)
                .bind(&record.institution)
                .bind(&record.department)
                .bind(&record.location)
                .bind(&record.salary_text)
                .bind(&record.qualifications)
                .bind(&record.application_instructions)
                .bind(&record.application_url)
                .bind(record.work_modality.map(|m| m.to_string()))
                .bind(record.contract_type.map(|c| c.to_string()))
                .bind(record.employment_type.map(|e| e.to_string()))
                .bind(record.posted_at)
                .bind(record.deadline_at)
                .bind(&hash)
                .bind(Utc::now())
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(Error::Database)?;

                Ok(LoadOutcome::Updated)
            }
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<JobRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM job_posting WHERE id = $1",
            Self::RECORD_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(Self::parse_record_row))
    }

    async fn find_by_source_url(&self, source_url: &str) -> Result<Option<JobRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM job_posting WHERE source_url = $1",
            Self::RECORD_COLUMNS
        ))
        .bind(source_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(Self::parse_record_row))
    }

    async fn job_text(&self, id: Uuid) -> Result<JobText> {
        let row = sqlx::query(
            "SELECT title, description, qualifications, salary_text, application_instructions
             FROM job_posting WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::JobNotFound(id))?;

        Ok(JobText {
            title: row.get("title"),
            description: row.get("description"),
            qualifications: row.get("qualifications"),
            salary: row.get("salary_text"),
            instructions: row.get("application_instructions"),
        })
    }

    async fn update_enrichment_fields(
        &self,
        id: Uuid,
        update: EnrichedFieldUpdate,
    ) -> Result<()> {
        // Build the SET list from populated fields only; the condition list
        // and the bind chain must stay in the same order.
        let mut sets = Vec::new();
        let mut idx = 1;
        macro_rules! set_col {
            ($field:expr, $col:literal) => {
                if $field.is_some() {
                    sets.push(format!(concat!($col, " = ${}"), idx));
                    idx += 1;
                }
            };
        }
        set_col!(update.keywords, "keywords");
        set_col!(update.category, "category");
        set_col!(update.work_modality, "work_modality");
        set_col!(update.contract_type, "contract_type");
        set_col!(update.employment_type, "employment_type");
        set_col!(update.summary, "summary");
        set_col!(update.department, "department");
        set_col!(update.duration, "duration");
        set_col!(update.deadline_at, "deadline_at");
        set_col!(update.application_url, "application_url");
        set_col!(update.application_instructions, "application_instructions");
        set_col!(update.education_level, "education_level");
        set_col!(update.field_of_study, "field_of_study");
        set_col!(update.experience_years, "experience_years");
        set_col!(update.city, "city");
        set_col!(update.region, "region");
        set_col!(update.country, "country");
        set_col!(update.latitude, "latitude");
        set_col!(update.longitude, "longitude");
        set_col!(update.contact_name, "contact_name");
        set_col!(update.contact_email, "contact_email");
        set_col!(update.contact_phone, "contact_phone");
        set_col!(update.research_areas, "research_areas");
        sets.push(format!("updated_at = ${}", idx));

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let query = format!(
            "UPDATE job_posting SET {} WHERE id = ${}",
            sets.join(", "),
            idx + 1
        );
        let mut q = sqlx::query(&query);
        if let Some(v) = &update.keywords {
            q = q.bind(v);
        }
        if let Some(v) = &update.category {
            q = q.bind(v);
        }
        if let Some(v) = update.work_modality {
            q = q.bind(v.to_string());
        }
        if let Some(v) = update.contract_type {
            q = q.bind(v.to_string());
        }
        if let Some(v) = update.employment_type {
            q = q.bind(v.to_string());
        }
        if let Some(v) = &update.summary {
            q = q.bind(v);
        }
        if let Some(v) = &update.department {
            q = q.bind(v);
        }
        if let Some(v) = &update.duration {
            q = q.bind(v);
        }
        if let Some(v) = update.deadline_at {
            q = q.bind(v);
        }
        if let Some(v) = &update.application_url {
            q = q.bind(v);
        }
        if let Some(v) = &update.application_instructions {
            q = q.bind(v);
        }
        if let Some(v) = &update.education_level {
            q = q.bind(v);
        }
        if let Some(v) = &update.field_of_study {
            q = q.bind(v);
        }
        if let Some(v) = update.experience_years {
            q = q.bind(v);
        }
        if let Some(v) = &update.city {
            q = q.bind(v);
        }
        if let Some(v) = &update.region {
            q = q.bind(v);
        }
        if let Some(v) = &update.country {
            q = q.bind(v);
        }
        if let Some(v) = update.latitude {
            q = q.bind(v);
        }
        if let Some(v) = update.longitude {
            q = q.bind(v);
        }
        if let Some(v) = &update.contact_name {
            q = q.bind(v);
        }
        if let Some(v) = &update.contact_email {
            q = q.bind(v);
        }
        if let Some(v) = &update.contact_phone {
            q = q.bind(v);
        }
        if let Some(v) = &update.research_areas {
            q = q.bind(v);
        }
        q = q.bind(Utc::now()).bind(id);

        let result = q.execute(&mut *tx).await.map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::JobNotFound(id));
        }

        // Replace the language requirement collection wholesale.
        if let Some(languages) = &update.languages {
            sqlx::query("DELETE FROM job_language_requirement WHERE job_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(Error::Database)?;

            for lang in languages {
                sqlx::query(
                    "INSERT INTO job_language_requirement (id, job_id, language, level)
                     VALUES ($1, $2, $3, $4)",
                )
                .bind(Uuid::new_v4())
                .bind(id)
                .bind(&lang.language)
                .bind(&lang.level)
                .execute(&mut *tx)
                .await
                .map_err(Error::Database)?;
            }
        }

        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "store",
            op = "update_enrichment_fields",
            job_id = %id,
            "Applied enriched field update"
        );
        Ok(())
    }

    async fn language_requirements(&self, id: Uuid) -> Result<Vec<LanguageRequirement>> {
        let rows = sqlx::query(
            "SELECT language, level FROM job_language_requirement
             WHERE job_id = $1 ORDER BY language ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| LanguageRequirement {
                language: row.get("language"),
                level: row.get("level"),
            })
            .collect())
    }

    async fn progress(&self, active_only: bool) -> Result<EnrichmentProgress> {
        let where_clause = if active_only {
            "WHERE status = 'active'::job_status"
        } else {
            ""
        };
        let query = format!(
            "SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE enrichment_status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE enrichment_status = 'in_progress') AS in_progress,
                COUNT(*) FILTER (WHERE enrichment_status = 'enriched') AS enriched,
                COUNT(*) FILTER (WHERE enrichment_status = 'failed') AS failed
             FROM job_posting {}",
            where_clause
        );

        let row = sqlx::query(&query)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(EnrichmentProgress {
            total: row.get("total"),
            pending: row.get("pending"),
            in_progress: row.get("in_progress"),
            enriched: row.get("enriched"),
            failed: row.get("failed"),
        })
    }

    async fn list_statuses(&self) -> Result<Vec<JobStatusSummary>> {
        let rows = sqlx::query(
            "SELECT id, title, source_url, status::text AS status,
                    enrichment_status::text AS enrichment_status, attempt_count,
                    last_attempt_at, enriched_at, enrichment_error
             FROM job_posting
             ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let status: String = row.get("status");
                let enrichment_status: String = row.get("enrichment_status");
                JobStatusSummary {
                    id: row.get("id"),
                    title: row.get("title"),
                    source_url: row.get("source_url"),
                    status: Self::str_to_job_status(&status),
                    enrichment_status: Self::str_to_enrichment_status(&enrichment_status),
                    attempt_count: row.get("attempt_count"),
                    last_attempt_at: row.get("last_attempt_at"),
                    enriched_at: row.get("enriched_at"),
                    error: row.get("enrichment_error"),
                }
            })
            .collect())
    }

    async fn mark_expired_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE job_posting
             SET status = 'expired'::job_status, updated_at = $1
             WHERE status = 'active'::job_status
               AND deadline_at IS NOT NULL AND deadline_at < $2",
        )
        .bind(Utc::now())
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(result.rows_affected())
    }
}
