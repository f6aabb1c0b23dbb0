//! Enrichment queue backed by Postgres row locking.
//!
//! The queue is the sole writer of `enrichment_status`, `attempt_count`, and
//! `last_attempt_at`. The claim is one atomic statement: selection under
//! `FOR UPDATE SKIP LOCKED` and the transition to `in_progress`, so any
//! number of concurrent claimants each receive a distinct job or nothing.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use sqlx::{Pool, Postgres, Row};
use tracing::{debug, info, warn};
use uuid::Uuid;

use scholarsync_core::{
    defaults, ClaimedJob, EnrichmentProgress, EnrichmentQueue, Error, Result,
};

/// PostgreSQL implementation of [`EnrichmentQueue`].
#[derive(Clone)]
pub struct PgEnrichmentQueue {
    pool: Pool<Postgres>,
    /// Failed jobs under this many attempts retry immediately.
    max_quick_attempts: i32,
    /// Failed jobs at or over the limit wait this long since the last attempt.
    retry_cooldown: ChronoDuration,
}

impl PgEnrichmentQueue {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            pool,
            max_quick_attempts: defaults::MAX_QUICK_ATTEMPTS,
            retry_cooldown: ChronoDuration::hours(defaults::RETRY_COOLDOWN_HOURS),
        }
    }

    /// Override the retry policy, mainly for tests.
    pub fn with_retry_policy(
        mut self,
        max_quick_attempts: i32,
        retry_cooldown: ChronoDuration,
    ) -> Self {
        self.max_quick_attempts = max_quick_attempts;
        self.retry_cooldown = retry_cooldown;
        self
    }
}

#[async_trait]
impl EnrichmentQueue for PgEnrichmentQueue {
    async fn select_next(&self) -> Result<Option<ClaimedJob>> {
        let now = Utc::now();
        let cooldown_cutoff = now - self.retry_cooldown;

        // Single-statement claim. The inner SELECT orders by the enum
        // (declaration order puts 'pending' before 'failed'), then oldest
        // attempt first with never-attempted rows at the front. SKIP LOCKED
        // makes concurrent claimants pass over rows already being claimed.
        let row = sqlx::query(
            "UPDATE job_posting
             SET enrichment_status = 'in_progress'::enrichment_status,
                 attempt_count = attempt_count + 1,
                 last_attempt_at = $1,
                 updated_at = $1
             WHERE id = (
                 SELECT id FROM job_posting
                 WHERE status = 'active'::job_status
                   AND (enrichment_status = 'pending'::enrichment_status
                        OR (enrichment_status = 'failed'::enrichment_status
                            AND (attempt_count < $2
                                 OR last_attempt_at IS NULL
                                 OR last_attempt_at < $3)))
                 ORDER BY enrichment_status ASC, last_attempt_at ASC NULLS FIRST
                 LIMIT 1
                 FOR UPDATE SKIP LOCKED
             )
             RETURNING id, source_url, title, attempt_count, last_attempt_at",
        )
        .bind(now)
        .bind(self.max_quick_attempts)
        .bind(cooldown_cutoff)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        match row {
            None => Ok(None),
            Some(row) => {
                let claimed = ClaimedJob {
                    id: row.get("id"),
                    source_url: row.get("source_url"),
                    title: row.get("title"),
                    attempt_count: row.get("attempt_count"),
                    last_attempt_at: row
                        .get::<Option<chrono::DateTime<Utc>>, _>("last_attempt_at")
                        .unwrap_or(now),
                };
                debug!(
                    subsystem = "db",
                    component = "queue",
                    op = "select_next",
                    job_id = %claimed.id,
                    attempt = claimed.attempt_count,
                    "Claimed job for enrichment"
                );
                Ok(Some(claimed))
            }
        }
    }

    async fn mark_enriched(&self, id: Uuid) -> Result<()> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE job_posting
             SET enrichment_status = 'enriched'::enrichment_status,
                 enriched_at = $1,
                 last_attempt_at = $1,
                 enrichment_error = NULL,
                 updated_at = $1
             WHERE id = $2",
        )
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::JobNotFound(id));
        }

        debug!(
            subsystem = "db",
            component = "queue",
            op = "mark_enriched",
            job_id = %id,
            "Job marked enriched"
        );
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<()> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE job_posting
             SET enrichment_status = 'failed'::enrichment_status,
                 enrichment_error = $1,
                 last_attempt_at = $2,
                 updated_at = $2
             WHERE id = $3",
        )
        .bind(error)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::JobNotFound(id));
        }

        warn!(
            subsystem = "db",
            component = "queue",
            op = "mark_failed",
            job_id = %id,
            error_msg = error,
            "Job marked failed"
        );
        Ok(())
    }

    async fn reset_to_pending(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query(
            "UPDATE job_posting
             SET enrichment_status = 'pending'::enrichment_status,
                 attempt_count = 0,
                 enrichment_error = NULL,
                 updated_at = $1
             WHERE id = $2",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::JobNotFound(id));
        }

        info!(
            subsystem = "db",
            component = "queue",
            op = "reset_to_pending",
            job_id = %id,
            "Job reset to pending"
        );
        Ok(())
    }

    async fn progress_snapshot(&self) -> Result<EnrichmentProgress> {
        // Same aggregate the store exposes, restricted to active postings
        // because that is the queue's working set.
        let row = sqlx::query(
            "SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE enrichment_status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE enrichment_status = 'in_progress') AS in_progress,
                COUNT(*) FILTER (WHERE enrichment_status = 'enriched') AS enriched,
                COUNT(*) FILTER (WHERE enrichment_status = 'failed') AS failed
             FROM job_posting
             WHERE status = 'active'::job_status",
        )
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

    async fn reclaim_stale(&self, stale_after: ChronoDuration) -> Result<u64> {
        let now = Utc::now();
        let cutoff = now - stale_after;

        let result = sqlx::query(
            "UPDATE job_posting
             SET enrichment_status = 'failed'::enrichment_status,
                 enrichment_error = 'reclaimed: stuck in_progress',
                 updated_at = $1
             WHERE enrichment_status = 'in_progress'::enrichment_status
               AND last_attempt_at IS NOT NULL
               AND last_attempt_at < $2",
        )
        .bind(now)
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        let reclaimed = result.rows_affected();
        if reclaimed > 0 {
            warn!(
                subsystem = "db",
                component = "queue",
                op = "reclaim_stale",
                result_count = reclaimed,
                "Reclaimed stale in_progress jobs"
            );
        }
        Ok(reclaimed)
    }
}
