//! Sync run audit log.

use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use tracing::info;
use uuid::Uuid;

use scholarsync_core::{Error, Result, SyncLogEntry, SyncStatus};

/// Counters accumulated over one sync run, written when the run closes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncTotals {
    pub pages_fetched: i32,
    pub records_fetched: i32,
    pub records_inserted: i32,
    pub records_updated: i32,
    pub records_skipped: i32,
    pub records_expired: i32,
    pub enriched_count: i32,
    pub failed_count: i32,
}

/// PostgreSQL-backed audit log of sync runs.
#[derive(Clone)]
pub struct PgSyncLog {
    pool: Pool<Postgres>,
}

impl PgSyncLog {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Open a new run in `running` state and return its id.
    pub async fn open(&self) -> Result<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO sync_log (id, started_at, status) VALUES ($1, $2, 'running')")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        info!(
            subsystem = "db",
            component = "sync_log",
            op = "open",
            sync_id = %id,
            "Sync run opened"
        );
        Ok(id)
    }

    /// Close a run with its final totals. `error` forces `failed` status.
    pub async fn finish(
        &self,
        id: Uuid,
        totals: SyncTotals,
        error: Option<&str>,
    ) -> Result<()> {
        let status = if error.is_some() {
            SyncStatus::Failed
        } else {
            SyncStatus::Completed
        };

        let result = sqlx::query(
            "UPDATE sync_log
             SET finished_at = $1, status = $2::sync_status,
                 pages_fetched = $3, records_fetched = $4,
                 records_inserted = $5, records_updated = $6,
                 records_skipped = $7, records_expired = $8,
                 enriched_count = $9, failed_count = $10, error = $11
             WHERE id = $12",
        )
        .bind(Utc::now())
        .bind(status.to_string())
        .bind(totals.pages_fetched)
        .bind(totals.records_fetched)
        .bind(totals.records_inserted)
        .bind(totals.records_updated)
        .bind(totals.records_skipped)
        .bind(totals.records_expired)
        .bind(totals.enriched_count)
        .bind(totals.failed_count)
        .bind(error)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("sync log entry {}", id)));
        }

        info!(
            subsystem = "db",
            component = "sync_log",
            op = "finish",
            sync_id = %id,
            success = error.is_none(),
            "Sync run closed"
        );
        Ok(())
    }

    /// Fetch one run by id.
    pub async fn get(&self, id: Uuid) -> Result<Option<SyncLogEntry>> {
        let row = sqlx::query(
            "SELECT id, started_at, finished_at, status::text AS status,
                    pages_fetched, records_fetched, records_inserted, records_updated,
                    records_skipped, records_expired, enriched_count, failed_count, error
             FROM sync_log WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(Self::parse_row))
    }

    /// Most recent runs, newest first.
    pub async fn list_recent(&self, limit: i64) -> Result<Vec<SyncLogEntry>> {
        let rows = sqlx::query(
            "SELECT id, started_at, finished_at, status::text AS status,
                    pages_fetched, records_fetched, records_inserted, records_updated,
                    records_skipped, records_expired, enriched_count, failed_count, error
             FROM sync_log ORDER BY started_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(Self::parse_row).collect())
    }

    fn parse_row(row: sqlx::postgres::PgRow) -> SyncLogEntry {
        let status: String = row.get("status");
        SyncLogEntry {
            id: row.get("id"),
            started_at: row.get("started_at"),
            finished_at: row.get("finished_at"),
            status: Self::str_to_status(&status),
            pages_fetched: row.get("pages_fetched"),
            records_fetched: row.get("records_fetched"),
            records_inserted: row.get("records_inserted"),
            records_updated: row.get("records_updated"),
            records_skipped: row.get("records_skipped"),
            records_expired: row.get("records_expired"),
            enriched_count: row.get("enriched_count"),
            failed_count: row.get("failed_count"),
            error: row.get("error"),
        }
    }

    fn str_to_status(s: &str) -> SyncStatus {
        match s {
            "running" => SyncStatus::Running,
            "completed" => SyncStatus::Completed,
            _ => SyncStatus::Failed,
        }
    }
}
