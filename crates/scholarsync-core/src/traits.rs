//! Core traits for scholarsync abstractions.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, enabling pluggable backends and testability. The
//! database crate implements the store and queue; the enrich crate
//! implements providers; the pipeline crate implements the feed
//! extractor and consumes all of them.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// JOB STORE
// =============================================================================

/// Durable read/write of job records and their enrichment state.
///
/// No business rules live here: eligibility and state transitions belong to
/// [`EnrichmentQueue`]. Storage errors surface unmodified so callers decide
/// the retry policy.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new posting. Fails on duplicate source URL.
    async fn insert(&self, record: NewJobRecord) -> Result<Uuid>;

    /// Insert or refresh a posting keyed by source URL.
    ///
    /// New postings start with enrichment state `pending`. Existing postings
    /// are refreshed only when the content hash changed; the enrichment
    /// sub-state is never touched by this path.
    async fn upsert(&self, record: NewJobRecord) -> Result<LoadOutcome>;

    /// Fetch a full record by ID.
    async fn get(&self, id: Uuid) -> Result<Option<JobRecord>>;

    /// Fetch a full record by its canonical source URL.
    async fn find_by_source_url(&self, source_url: &str) -> Result<Option<JobRecord>>;

    /// Fetch just the text bundle a provider needs for one job.
    async fn job_text(&self, id: Uuid) -> Result<JobText>;

    /// Apply a partial enriched-field update.
    ///
    /// Only columns that are `Some` in the update are written; list-valued
    /// members replace the stored collection wholesale in the same
    /// transaction. Fails with [`crate::Error::JobNotFound`] for unknown ids.
    async fn update_enrichment_fields(&self, id: Uuid, update: EnrichedFieldUpdate)
        -> Result<()>;

    /// Current language requirements for a job.
    async fn language_requirements(&self, id: Uuid) -> Result<Vec<LanguageRequirement>>;

    /// Group counts by enrichment status, optionally restricted to `active`
    /// postings.
    async fn progress(&self, active_only: bool) -> Result<EnrichmentProgress>;

    /// Status listing for operator tooling, newest postings first.
    async fn list_statuses(&self) -> Result<Vec<JobStatusSummary>>;

    /// Mark `active` postings whose deadline passed as `expired`.
    /// Returns the number of rows transitioned.
    async fn mark_expired_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

// =============================================================================
// ENRICHMENT QUEUE
// =============================================================================

/// The enrichment state machine. The sole writer of `enrichment_status`,
/// `attempt_count`, and `last_attempt_at`.
#[async_trait]
pub trait EnrichmentQueue: Send + Sync {
    /// Claim the next eligible job.
    ///
    /// Eligibility: posting `active`, and enrichment `pending`, or `failed`
    /// with fewer than the quick-attempt limit or a cooldown window already
    /// served. Ordering: `pending` before `failed`, then oldest
    /// `last_attempt_at` first (nulls first). Selection and the transition to
    /// `in_progress` (with `attempt_count` increment and `last_attempt_at`
    /// refresh) are a single atomic step, safe under concurrent callers.
    ///
    /// `Ok(None)` is the queue's empty signal, not an error.
    async fn select_next(&self) -> Result<Option<ClaimedJob>>;

    /// Terminal success transition. Sets `enriched`, stamps `enriched_at`
    /// and `last_attempt_at`, clears the stored error. Idempotent.
    async fn mark_enriched(&self, id: Uuid) -> Result<()>;

    /// Failure transition. Sets `failed`, records the message, refreshes
    /// `last_attempt_at`. Leaves `attempt_count` as the claim set it.
    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<()>;

    /// Manual operator reset: back to `pending` with `attempt_count = 0`
    /// and the error cleared. Bypasses the retry window.
    async fn reset_to_pending(&self, id: Uuid) -> Result<()>;

    /// Aggregate counts for observability. Never used for control flow.
    async fn progress_snapshot(&self) -> Result<EnrichmentProgress>;

    /// Operator bulk recovery: move jobs stuck `in_progress` longer than
    /// `stale_after` to `failed` so they re-enter the bounded retry path.
    /// Returns the number of rows reclaimed. Never invoked automatically.
    async fn reclaim_stale(&self, stale_after: Duration) -> Result<u64>;
}

// =============================================================================
// ENRICHMENT PROVIDER
// =============================================================================

/// A pluggable LLM enrichment backend.
///
/// Implementations receive the canonical [`JobText`] bundle and return one
/// [`EnrichedData`] document. The executor and runner are provider-agnostic;
/// the concrete instance is injected at construction.
#[async_trait]
pub trait EnrichmentProvider: Send + Sync {
    /// Run one enrichment call. Fails with
    /// [`crate::Error::ProviderUnavailable`] on transport/provider errors or
    /// [`crate::Error::Validation`] when the output fails schema checks.
    async fn enrich_job(&self, job: &JobText) -> Result<EnrichedData>;

    /// Cheap configuration-level availability check (no I/O).
    fn is_available(&self) -> bool;

    /// Async capability probe against the live service.
    async fn health_check(&self) -> Result<bool>;

    /// Adapter name for logging ("ollama", "openai", "mock").
    fn name(&self) -> &str;
}

// =============================================================================
// JOB FEED
// =============================================================================

/// One raw posting as the upstream feed returns it. Field names follow the
/// feed's JSON; everything except the identity fields is optional because
/// upstream data quality varies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawJobRecord {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub employer: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub salary: Option<String>,
    #[serde(default)]
    pub contract_type: Option<String>,
    #[serde(default)]
    pub hours: Option<String>,
    #[serde(default)]
    pub placed_on: Option<String>,
    #[serde(default)]
    pub closes: Option<String>,
    /// Raw HTML description.
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub qualifications: Option<String>,
    #[serde(default)]
    pub how_to_apply: Option<String>,
    #[serde(default)]
    pub apply_url: Option<String>,
}

/// Paginated fetch of raw job records from the upstream API.
#[async_trait]
pub trait JobFeedExtractor: Send + Sync {
    /// Fetch one page (1-based). A short or empty page signals the end of
    /// the feed.
    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<Vec<RawJobRecord>>;
}
