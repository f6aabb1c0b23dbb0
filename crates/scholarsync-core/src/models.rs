//! Core data models for scholarsync.
//!
//! These types are shared across all scholarsync crates and represent
//! the core domain entities: the job posting record, its embedded
//! enrichment state machine, and the transient provider output shapes.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::defaults;

// =============================================================================
// JOB LIFECYCLE
// =============================================================================

/// Lifecycle status of a job posting.
///
/// Maintained by the sync phase; only `active` postings participate in
/// enrichment selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Active,
    Expired,
    Removed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Expired => write!(f, "expired"),
            Self::Removed => write!(f, "removed"),
        }
    }
}

/// Enrichment status of a job posting.
///
/// Variant declaration order is load-bearing: it matches the Postgres enum
/// declaration, so sorting ascending puts `pending` before `failed`, which is
/// the selection order the queue relies on. Keep the derive of `Ord` and the
/// migration enum in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStatus {
    Pending,
    InProgress,
    Enriched,
    Failed,
}

impl std::fmt::Display for EnrichmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Enriched => write!(f, "enriched"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

// =============================================================================
// STRUCTURED ATTRIBUTE ENUMS
// =============================================================================

/// Where the work happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkModality {
    OnSite,
    Hybrid,
    Remote,
}

impl WorkModality {
    /// Parse from free text (case-insensitive, accepts hyphens/spaces).
    /// Used by the deterministic transform heuristics and by provider output
    /// normalization.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().replace(['-', ' '], "_").as_str() {
            "on_site" | "onsite" | "on_campus" | "in_person" => Some(Self::OnSite),
            "hybrid" => Some(Self::Hybrid),
            "remote" | "fully_remote" | "work_from_home" => Some(Self::Remote),
            _ => None,
        }
    }
}

impl std::fmt::Display for WorkModality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OnSite => write!(f, "on_site"),
            Self::Hybrid => write!(f, "hybrid"),
            Self::Remote => write!(f, "remote"),
        }
    }
}

/// Contract permanence class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractType {
    Permanent,
    FixedTerm,
    Temporary,
}

impl ContractType {
    /// Parse from free text (case-insensitive, accepts hyphens/spaces).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().replace(['-', ' '], "_").as_str() {
            "permanent" | "open_ended" | "indefinite" | "tenure" | "tenured" => {
                Some(Self::Permanent)
            }
            "fixed_term" | "fixed" | "contract" | "tenure_track" => Some(Self::FixedTerm),
            "temporary" | "temp" | "casual" | "interim" => Some(Self::Temporary),
            _ => None,
        }
    }
}

impl std::fmt::Display for ContractType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Permanent => write!(f, "permanent"),
            Self::FixedTerm => write!(f, "fixed_term"),
            Self::Temporary => write!(f, "temporary"),
        }
    }
}

/// Weekly hours class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentType {
    FullTime,
    PartTime,
}

impl EmploymentType {
    /// Parse from free text (case-insensitive, accepts hyphens/spaces).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().replace(['-', ' '], "_").as_str() {
            "full_time" | "fulltime" => Some(Self::FullTime),
            "part_time" | "parttime" => Some(Self::PartTime),
            _ => None,
        }
    }
}

impl std::fmt::Display for EmploymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FullTime => write!(f, "full_time"),
            Self::PartTime => write!(f, "part_time"),
        }
    }
}

// =============================================================================
// ENRICHMENT STATE
// =============================================================================

/// Per-job enrichment sub-state, embedded 1:1 in [`JobRecord`].
///
/// State machine:
/// ```text
/// pending ──select──> in_progress ──success──> enriched (terminal)
/// pending ──select──> in_progress ──failure──> failed
/// failed  ──(eligible & select)──> in_progress
/// failed|pending ──manual reset──> pending
/// ```
/// There is no automatic transition out of `in_progress`; a crashed run
/// leaves the job there until an operator resets or reclaims it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentState {
    pub status: EnrichmentStatus,
    /// Incremented exactly once per transition into `in_progress`.
    pub attempt_count: i32,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub enriched_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl Default for EnrichmentState {
    fn default() -> Self {
        Self {
            status: EnrichmentStatus::Pending,
            attempt_count: 0,
            last_attempt_at: None,
            enriched_at: None,
            error: None,
        }
    }
}

impl EnrichmentState {
    /// Retry eligibility of this sub-state, ignoring the posting lifecycle.
    ///
    /// `pending` is always eligible. `failed` is eligible while
    /// `attempt_count` is under [`defaults::MAX_QUICK_ATTEMPTS`], and after
    /// that only once the [`defaults::RETRY_COOLDOWN_HOURS`] window since
    /// `last_attempt_at` has passed. `in_progress` and `enriched` are never
    /// eligible.
    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            EnrichmentStatus::Pending => true,
            EnrichmentStatus::Failed => {
                if self.attempt_count < defaults::MAX_QUICK_ATTEMPTS {
                    return true;
                }
                match self.last_attempt_at {
                    Some(at) => now - at > Duration::hours(defaults::RETRY_COOLDOWN_HOURS),
                    None => true,
                }
            }
            EnrichmentStatus::InProgress | EnrichmentStatus::Enriched => false,
        }
    }
}

// =============================================================================
// JOB RECORD
// =============================================================================

/// Canonical job posting. Identity is the source URL (unique per posting).
///
/// Deterministic fields are written by the loader during sync; enriched
/// fields are written only by the executor once confidence thresholds are
/// met; `enrichment` bookkeeping is written only by the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub source_url: String,
    pub title: String,
    /// Raw description as fetched from the feed.
    pub description_html: Option<String>,
    /// Cleaned plain-text description.
    pub description: String,
    pub institution: Option<String>,
    pub department: Option<String>,
    pub location: Option<String>,
    pub salary_text: Option<String>,
    pub qualifications: Option<String>,
    pub application_instructions: Option<String>,
    pub application_url: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    pub deadline_at: Option<DateTime<Utc>>,

    // Enriched classification fields
    pub category: Option<String>,
    pub work_modality: Option<WorkModality>,
    pub contract_type: Option<ContractType>,
    pub employment_type: Option<EmploymentType>,
    pub keywords: Vec<String>,
    pub summary: Option<String>,
    pub duration: Option<String>,
    pub education_level: Option<String>,
    pub field_of_study: Option<String>,
    pub experience_years: Option<i32>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub research_areas: Vec<String>,

    pub status: JobStatus,
    /// SHA-256 over the normalized text fields; drives change detection on
    /// re-sync.
    pub content_hash: String,
    pub enrichment: EnrichmentState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// Full selection eligibility: active lifecycle plus sub-state retry
    /// eligibility.
    pub fn is_enrichable(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Active && self.enrichment.is_eligible(now)
    }
}

/// Fields required to create (or re-sync) a job posting. Produced by the
/// deterministic transform; consumed by the loader.
#[derive(Debug, Clone, Default)]
pub struct NewJobRecord {
    pub source_url: String,
    pub title: String,
    pub description_html: Option<String>,
    pub description: String,
    pub institution: Option<String>,
    pub department: Option<String>,
    pub location: Option<String>,
    pub salary_text: Option<String>,
    pub qualifications: Option<String>,
    pub application_instructions: Option<String>,
    pub application_url: Option<String>,
    /// Deterministic heuristics may pre-fill these; enrichment refines them.
    pub work_modality: Option<WorkModality>,
    pub contract_type: Option<ContractType>,
    pub employment_type: Option<EmploymentType>,
    pub posted_at: Option<DateTime<Utc>>,
    pub deadline_at: Option<DateTime<Utc>>,
}

/// Outcome of loading one normalized record into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// New posting; enrichment state starts at `pending`.
    Inserted,
    /// Existing posting whose content hash changed; deterministic fields
    /// refreshed, enrichment state untouched.
    Updated,
    /// Existing posting with identical content hash; nothing written.
    Unchanged,
}

// =============================================================================
// JOB TEXT
// =============================================================================

/// Canonical text bundle handed to enrichment providers.
///
/// Every provider accepts exactly this shape; nothing downstream constructs
/// partial job objects to satisfy provider call signatures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobText {
    pub title: String,
    pub description: String,
    pub qualifications: Option<String>,
    pub salary: Option<String>,
    pub instructions: Option<String>,
}

impl JobText {
    pub fn from_record(record: &JobRecord) -> Self {
        Self {
            title: record.title.clone(),
            description: record.description.clone(),
            qualifications: record.qualifications.clone(),
            salary: record.salary_text.clone(),
            instructions: record.application_instructions.clone(),
        }
    }

    /// True when there is no usable text to enrich.
    pub fn is_empty(&self) -> bool {
        self.title.trim().is_empty() && self.description.trim().is_empty()
    }
}

// =============================================================================
// ENRICHED DATA (provider output)
// =============================================================================

/// One language requirement extracted by a provider. The stored collection
/// is replaced wholesale on every accepted `languages` group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageRequirement {
    pub language: String,
    #[serde(default)]
    pub level: Option<String>,
}

/// Classification keywords with provider confidence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeywordsGroup {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub confidence: f32,
}

/// Core job attributes with provider confidence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttributesGroup {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub work_modality: Option<WorkModality>,
    #[serde(default)]
    pub contract_type: Option<ContractType>,
    #[serde(default)]
    pub employment_type: Option<EmploymentType>,
    #[serde(default)]
    pub confidence: f32,
}

/// Secondary descriptive details.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetailsGroup {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub confidence: f32,
}

/// Application requirements (deadline as ISO `YYYY-MM-DD`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationGroup {
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub confidence: f32,
}

/// Language requirements.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LanguagesGroup {
    #[serde(default)]
    pub languages: Vec<LanguageRequirement>,
    #[serde(default)]
    pub confidence: f32,
}

/// Education/experience background requirements.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackgroundGroup {
    #[serde(default)]
    pub education_level: Option<String>,
    #[serde(default)]
    pub field_of_study: Option<String>,
    #[serde(default)]
    pub experience_years: Option<i32>,
    #[serde(default)]
    pub confidence: f32,
}

/// Geographic placement of the position.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeolocationGroup {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub confidence: f32,
}

/// Contact person for the posting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactGroup {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub confidence: f32,
}

/// Academic research areas.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchAreasGroup {
    #[serde(default)]
    pub research_areas: Vec<String>,
    #[serde(default)]
    pub confidence: f32,
}

/// Structured output of one provider call. Transient; never stored as-is.
///
/// Each group is independent: a group that fails its own schema or falls
/// below its confidence threshold is dropped without affecting the others.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichedData {
    #[serde(default)]
    pub keywords: Option<KeywordsGroup>,
    #[serde(default)]
    pub attributes: Option<AttributesGroup>,
    #[serde(default)]
    pub details: Option<DetailsGroup>,
    #[serde(default)]
    pub application: Option<ApplicationGroup>,
    #[serde(default)]
    pub languages: Option<LanguagesGroup>,
    #[serde(default)]
    pub background: Option<BackgroundGroup>,
    #[serde(default)]
    pub geolocation: Option<GeolocationGroup>,
    #[serde(default)]
    pub contact: Option<ContactGroup>,
    #[serde(default)]
    pub research_areas: Option<ResearchAreasGroup>,
}

impl EnrichedData {
    /// True when no group is present at all.
    pub fn is_empty(&self) -> bool {
        self.keywords.is_none()
            && self.attributes.is_none()
            && self.details.is_none()
            && self.application.is_none()
            && self.languages.is_none()
            && self.background.is_none()
            && self.geolocation.is_none()
            && self.contact.is_none()
            && self.research_areas.is_none()
    }
}

// =============================================================================
// FIELD UPDATE (executor → store)
// =============================================================================

/// Partial update of enriched fields. `None` means "leave the stored value
/// untouched"; the store only writes columns that are `Some`. List-valued
/// members replace the stored collection wholesale.
#[derive(Debug, Clone, Default)]
pub struct EnrichedFieldUpdate {
    pub keywords: Option<Vec<String>>,
    pub category: Option<String>,
    pub work_modality: Option<WorkModality>,
    pub contract_type: Option<ContractType>,
    pub employment_type: Option<EmploymentType>,
    pub summary: Option<String>,
    pub department: Option<String>,
    pub duration: Option<String>,
    pub deadline_at: Option<DateTime<Utc>>,
    pub application_url: Option<String>,
    pub application_instructions: Option<String>,
    pub education_level: Option<String>,
    pub field_of_study: Option<String>,
    pub experience_years: Option<i32>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub research_areas: Option<Vec<String>>,
    pub languages: Option<Vec<LanguageRequirement>>,
}

impl EnrichedFieldUpdate {
    /// True when the update would write nothing.
    pub fn is_empty(&self) -> bool {
        self.keywords.is_none()
            && self.category.is_none()
            && self.work_modality.is_none()
            && self.contract_type.is_none()
            && self.employment_type.is_none()
            && self.summary.is_none()
            && self.department.is_none()
            && self.duration.is_none()
            && self.deadline_at.is_none()
            && self.application_url.is_none()
            && self.application_instructions.is_none()
            && self.education_level.is_none()
            && self.field_of_study.is_none()
            && self.experience_years.is_none()
            && self.city.is_none()
            && self.region.is_none()
            && self.country.is_none()
            && self.latitude.is_none()
            && self.longitude.is_none()
            && self.contact_name.is_none()
            && self.contact_email.is_none()
            && self.contact_phone.is_none()
            && self.research_areas.is_none()
            && self.languages.is_none()
    }
}

// =============================================================================
// QUEUE TYPES
// =============================================================================

/// The slice of a job returned by an atomic claim. The row is already
/// `in_progress` with its attempt counter incremented when this is returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimedJob {
    pub id: Uuid,
    pub source_url: String,
    pub title: String,
    /// Attempt counter after the claim (1 for a fresh job).
    pub attempt_count: i32,
    pub last_attempt_at: DateTime<Utc>,
}

/// Aggregate enrichment counts for observability. Not used for control flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentProgress {
    pub total: i64,
    pub pending: i64,
    pub in_progress: i64,
    pub enriched: i64,
    pub failed: i64,
}

/// One row of the operator status listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusSummary {
    pub id: Uuid,
    pub title: String,
    pub source_url: String,
    pub status: JobStatus,
    pub enrichment_status: EnrichmentStatus,
    pub attempt_count: i32,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub enriched_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

// =============================================================================
// SYNC LOG
// =============================================================================

/// Outcome status of one orchestrated sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Audit record of one sync run (ETL + enrichment phases).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncLogEntry {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub status: SyncStatus,
    pub pages_fetched: i32,
    pub records_fetched: i32,
    pub records_inserted: i32,
    pub records_updated: i32,
    pub records_skipped: i32,
    pub records_expired: i32,
    pub enriched_count: i32,
    pub failed_count: i32,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed_state(attempts: i32, last_attempt_hours_ago: Option<i64>) -> EnrichmentState {
        EnrichmentState {
            status: EnrichmentStatus::Failed,
            attempt_count: attempts,
            last_attempt_at: last_attempt_hours_ago.map(|h| Utc::now() - Duration::hours(h)),
            enriched_at: None,
            error: Some("provider timeout".to_string()),
        }
    }

    #[test]
    fn pending_is_always_eligible() {
        let state = EnrichmentState::default();
        assert!(state.is_eligible(Utc::now()));
    }

    #[test]
    fn in_progress_is_never_eligible() {
        let state = EnrichmentState {
            status: EnrichmentStatus::InProgress,
            attempt_count: 1,
            last_attempt_at: Some(Utc::now()),
            ..Default::default()
        };
        assert!(!state.is_eligible(Utc::now()));
    }

    #[test]
    fn enriched_is_never_eligible() {
        let state = EnrichmentState {
            status: EnrichmentStatus::Enriched,
            attempt_count: 1,
            last_attempt_at: Some(Utc::now()),
            enriched_at: Some(Utc::now()),
            error: None,
        };
        assert!(!state.is_eligible(Utc::now()));
    }

    #[test]
    fn failed_under_quick_attempts_is_eligible() {
        // attempt_count < 3 retries immediately, even seconds after failing
        assert!(failed_state(1, Some(0)).is_eligible(Utc::now()));
        assert!(failed_state(2, Some(0)).is_eligible(Utc::now()));
    }

    #[test]
    fn failed_at_quick_limit_within_cooldown_is_not_eligible() {
        // Scenario B: 3 failures with a recent attempt waits out the window
        assert!(!failed_state(3, Some(1)).is_eligible(Utc::now()));
        assert!(!failed_state(5, Some(23)).is_eligible(Utc::now()));
    }

    #[test]
    fn failed_at_quick_limit_after_cooldown_is_eligible() {
        assert!(failed_state(3, Some(25)).is_eligible(Utc::now()));
        assert!(failed_state(10, Some(48)).is_eligible(Utc::now()));
    }

    #[test]
    fn failed_exactly_at_cooldown_boundary_is_not_eligible() {
        // Strictly older than 24h, not equal
        let state = failed_state(3, Some(24));
        let now = state.last_attempt_at.unwrap() + Duration::hours(24);
        assert!(!state.is_eligible(now));
    }

    #[test]
    fn failed_without_last_attempt_is_eligible() {
        // Defensive branch: failed with no recorded attempt time
        assert!(failed_state(3, None).is_eligible(Utc::now()));
    }

    #[test]
    fn enrichment_status_ordering_matches_selection_order() {
        // pending must sort before failed for queue ordering
        assert!(EnrichmentStatus::Pending < EnrichmentStatus::Failed);
        assert!(EnrichmentStatus::Pending < EnrichmentStatus::InProgress);
        assert!(EnrichmentStatus::InProgress < EnrichmentStatus::Enriched);
    }

    #[test]
    fn enrichment_status_display_round_trip() {
        for (status, s) in [
            (EnrichmentStatus::Pending, "pending"),
            (EnrichmentStatus::InProgress, "in_progress"),
            (EnrichmentStatus::Enriched, "enriched"),
            (EnrichmentStatus::Failed, "failed"),
        ] {
            assert_eq!(status.to_string(), s);
            let parsed: EnrichmentStatus =
                serde_json::from_str(&format!("\"{}\"", s)).unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn job_status_display() {
        assert_eq!(JobStatus::Active.to_string(), "active");
        assert_eq!(JobStatus::Expired.to_string(), "expired");
        assert_eq!(JobStatus::Removed.to_string(), "removed");
    }

    #[test]
    fn work_modality_from_str_loose() {
        assert_eq!(WorkModality::from_str_loose("Remote"), Some(WorkModality::Remote));
        assert_eq!(WorkModality::from_str_loose("on-site"), Some(WorkModality::OnSite));
        assert_eq!(WorkModality::from_str_loose("On Site"), Some(WorkModality::OnSite));
        assert_eq!(WorkModality::from_str_loose("hybrid"), Some(WorkModality::Hybrid));
        assert_eq!(WorkModality::from_str_loose("carrier pigeon"), None);
    }

    #[test]
    fn contract_type_from_str_loose() {
        assert_eq!(
            ContractType::from_str_loose("Fixed-Term"),
            Some(ContractType::FixedTerm)
        );
        assert_eq!(
            ContractType::from_str_loose("tenure track"),
            Some(ContractType::FixedTerm)
        );
        assert_eq!(ContractType::from_str_loose("Permanent"), Some(ContractType::Permanent));
        assert_eq!(ContractType::from_str_loose("casual"), Some(ContractType::Temporary));
        assert_eq!(ContractType::from_str_loose(""), None);
    }

    #[test]
    fn employment_type_from_str_loose() {
        assert_eq!(
            EmploymentType::from_str_loose("Full Time"),
            Some(EmploymentType::FullTime)
        );
        assert_eq!(
            EmploymentType::from_str_loose("part-time"),
            Some(EmploymentType::PartTime)
        );
        assert_eq!(EmploymentType::from_str_loose("zero hours"), None);
    }

    #[test]
    fn job_text_is_empty() {
        let text = JobText {
            title: "  ".to_string(),
            description: "".to_string(),
            qualifications: None,
            salary: None,
            instructions: None,
        };
        assert!(text.is_empty());

        let text = JobText {
            title: "Lecturer in Physics".to_string(),
            description: "".to_string(),
            qualifications: None,
            salary: None,
            instructions: None,
        };
        assert!(!text.is_empty());
    }

    #[test]
    fn enriched_data_default_is_empty() {
        assert!(EnrichedData::default().is_empty());
        let data = EnrichedData {
            keywords: Some(KeywordsGroup {
                keywords: vec!["physics".to_string()],
                confidence: 0.9,
            }),
            ..Default::default()
        };
        assert!(!data.is_empty());
    }

    #[test]
    fn enriched_data_parses_partial_payload() {
        // Missing groups and missing confidence default cleanly
        let json = r#"{
            "attributes": {"category": "lecturer", "work_modality": "on_site", "confidence": 0.8},
            "geolocation": {"city": "Uppsala", "country": "Sweden"}
        }"#;
        let data: EnrichedData = serde_json::from_str(json).unwrap();
        let attrs = data.attributes.unwrap();
        assert_eq!(attrs.category.as_deref(), Some("lecturer"));
        assert_eq!(attrs.work_modality, Some(WorkModality::OnSite));
        assert!((attrs.confidence - 0.8).abs() < f32::EPSILON);
        let geo = data.geolocation.unwrap();
        assert_eq!(geo.city.as_deref(), Some("Uppsala"));
        assert!(geo.confidence.abs() < f32::EPSILON);
        assert!(data.keywords.is_none());
    }

    #[test]
    fn application_group_parses_iso_deadline() {
        let json = r#"{"deadline": "2026-03-15", "confidence": 0.4}"#;
        let group: ApplicationGroup = serde_json::from_str(json).unwrap();
        assert_eq!(
            group.deadline,
            Some(NaiveDate::from_ymd_opt(2026, 3, 15).unwrap())
        );
    }

    #[test]
    fn application_group_rejects_malformed_deadline() {
        let json = r#"{"deadline": "next spring", "confidence": 0.4}"#;
        assert!(serde_json::from_str::<ApplicationGroup>(json).is_err());
    }

    #[test]
    fn field_update_is_empty() {
        assert!(EnrichedFieldUpdate::default().is_empty());
        let update = EnrichedFieldUpdate {
            category: Some("postdoc".to_string()),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn job_record_enrichable_requires_active_status() {
        let mut record = JobRecord {
            id: Uuid::new_v4(),
            source_url: "https://example.edu/jobs/1".to_string(),
            title: "Postdoc".to_string(),
            description_html: None,
            description: "A postdoc position".to_string(),
            institution: None,
            department: None,
            location: None,
            salary_text: None,
            qualifications: None,
            application_instructions: None,
            application_url: None,
            posted_at: None,
            deadline_at: None,
            category: None,
            work_modality: None,
            contract_type: None,
            employment_type: None,
            keywords: vec![],
            summary: None,
            duration: None,
            education_level: None,
            field_of_study: None,
            experience_years: None,
            city: None,
            region: None,
            country: None,
            latitude: None,
            longitude: None,
            contact_name: None,
            contact_email: None,
            contact_phone: None,
            research_areas: vec![],
            status: JobStatus::Active,
            content_hash: String::new(),
            enrichment: EnrichmentState::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(record.is_enrichable(Utc::now()));

        record.status = JobStatus::Expired;
        assert!(!record.is_enrichable(Utc::now()));
    }

    #[test]
    fn sync_status_display() {
        assert_eq!(SyncStatus::Running.to_string(), "running");
        assert_eq!(SyncStatus::Completed.to_string(), "completed");
        assert_eq!(SyncStatus::Failed.to_string(), "failed");
    }
}
