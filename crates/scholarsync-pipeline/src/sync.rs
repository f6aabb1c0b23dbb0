//! Sync orchestration.
//!
//! One sync run is: open an audit row, page through the feed (extract,
//! transform, upsert), expire postings past their deadline, hand control to
//! the sequential runner for enrichment, close the audit row. Per-record
//! problems are counted and logged; only infrastructure failures abort the
//! run, and those land in the audit row as `failed`.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use scholarsync_core::{
    defaults, EnrichmentProvider, JobFeedExtractor, JobStore, LoadOutcome, Result,
};
use scholarsync_db::{Database, PgEnrichmentQueue, PgJobStore, SyncTotals};

use crate::executor::EnrichmentExecutor;
use crate::runner::{RunReport, RunnerConfig, SequentialRunner};
use crate::transform::transform;

/// Configuration for one sync run.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Records requested per feed page.
    pub page_size: u32,
    /// Page cap per run.
    pub max_pages: u32,
    /// Expire postings whose deadline passed.
    pub mark_expired: bool,
    /// Run the enrichment phase after the ETL phase.
    pub run_enrichment: bool,
    /// Runner settings for the enrichment phase.
    pub runner: RunnerConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: defaults::FEED_PAGE_SIZE,
            max_pages: defaults::FEED_MAX_PAGES,
            mark_expired: true,
            run_enrichment: true,
            runner: RunnerConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `FEED_PAGE_SIZE` | `50` | Records per feed page |
    /// | `FEED_MAX_PAGES` | `20` | Page cap per run |
    /// | `SYNC_MARK_EXPIRED` | `true` | Expire past-deadline postings |
    /// | `SYNC_RUN_ENRICHMENT` | `true` | Run enrichment after ETL |
    ///
    /// The embedded runner config reads its own variables, see
    /// [`RunnerConfig::from_env`].
    pub fn from_env() -> Self {
        let mut config = Self {
            runner: RunnerConfig::from_env(),
            ..Self::default()
        };

        if let Some(n) = std::env::var("FEED_PAGE_SIZE")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
        {
            config.page_size = n.max(1);
        }
        if let Some(n) = std::env::var("FEED_MAX_PAGES")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
        {
            config.max_pages = n.max(1);
        }
        if let Ok(v) = std::env::var("SYNC_MARK_EXPIRED") {
            config.mark_expired = v != "false" && v != "0";
        }
        if let Ok(v) = std::env::var("SYNC_RUN_ENRICHMENT") {
            config.run_enrichment = v != "false" && v != "0";
        }

        config
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_mark_expired(mut self, mark_expired: bool) -> Self {
        self.mark_expired = mark_expired;
        self
    }

    pub fn with_run_enrichment(mut self, run_enrichment: bool) -> Self {
        self.run_enrichment = run_enrichment;
        self
    }

    pub fn with_runner(mut self, runner: RunnerConfig) -> Self {
        self.runner = runner;
        self
    }
}

/// Outcome of one sync run.
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// Audit row recording this run.
    pub sync_log_id: Uuid,
    pub totals: SyncTotals,
    /// Present when the enrichment phase ran.
    pub enrichment: Option<RunReport>,
}

/// Coordinates the deterministic ETL phase and the enrichment phase over one
/// database.
pub struct SyncOrchestrator<E, P: ?Sized> {
    db: Database,
    extractor: E,
    provider: Arc<P>,
    config: SyncConfig,
}

impl<E, P> SyncOrchestrator<E, P>
where
    E: JobFeedExtractor,
    P: EnrichmentProvider + ?Sized,
{
    pub fn new(db: Database, extractor: E, provider: Arc<P>, config: SyncConfig) -> Self {
        Self {
            db,
            extractor,
            provider,
            config,
        }
    }

    /// Run one full sync. The audit row always reaches a terminal status:
    /// `completed` with the counters, or `failed` carrying the error.
    #[instrument(skip(self), fields(subsystem = "pipeline", component = "sync", op = "run"))]
    pub async fn run(&self) -> Result<SyncReport> {
        let sync_log_id = self.db.sync_log.open().await?;
        info!(sync_log_id = %sync_log_id, "Sync run started");

        let mut totals = SyncTotals::default();
        match self.run_phases(&mut totals).await {
            Ok(enrichment) => {
                self.db.sync_log.finish(sync_log_id, totals, None).await?;
                info!(
                    sync_log_id = %sync_log_id,
                    inserted = totals.records_inserted,
                    updated = totals.records_updated,
                    skipped = totals.records_skipped,
                    enriched = totals.enriched_count,
                    "Sync run completed"
                );
                Ok(SyncReport {
                    sync_log_id,
                    totals,
                    enrichment,
                })
            }
            Err(e) => {
                error!(sync_log_id = %sync_log_id, error_msg = %e, "Sync run failed");
                self.db
                    .sync_log
                    .finish(sync_log_id, totals, Some(&e.to_string()))
                    .await?;
                Err(e)
            }
        }
    }

    async fn run_phases(&self, totals: &mut SyncTotals) -> Result<Option<RunReport>> {
        self.etl_phase(totals).await?;

        if self.config.mark_expired {
            let expired = self.db.jobs.mark_expired_before(Utc::now()).await?;
            totals.records_expired = expired as i32;
            if expired > 0 {
                info!(expired, "Expired postings past their deadline");
            }
        }

        if !self.config.run_enrichment {
            return Ok(None);
        }

        let report = self.enrichment_phase().await?;
        totals.enriched_count = report.enriched as i32;
        totals.failed_count = report.failed as i32;
        Ok(Some(report))
    }

    /// Page through the feed until a short or empty page, loading each record.
    async fn etl_phase(&self, totals: &mut SyncTotals) -> Result<()> {
        for page in 1..=self.config.max_pages {
            let records = self
                .extractor
                .fetch_page(page, self.config.page_size)
                .await?;
            totals.pages_fetched += 1;
            let page_len = records.len();

            for raw in records {
                totals.records_fetched += 1;
                let source_url = raw.url.clone();
                let normalized = transform(raw);
                match self.db.jobs.upsert(normalized).await {
                    Ok(LoadOutcome::Inserted) => totals.records_inserted += 1,
                    Ok(LoadOutcome::Updated) => totals.records_updated += 1,
                    Ok(LoadOutcome::Unchanged) => totals.records_skipped += 1,
                    Err(e) => {
                        // A bad record must not sink the whole run.
                        warn!(source_url = %source_url, error_msg = %e, "Failed to load record");
                        totals.records_skipped += 1;
                    }
                }
            }

            if page_len < self.config.page_size as usize {
                break;
            }
        }
        Ok(())
    }

    async fn enrichment_phase(&self) -> Result<RunReport> {
        let store: Arc<PgJobStore> = Arc::new(self.db.jobs.clone());
        let queue: Arc<PgEnrichmentQueue> = Arc::new(self.db.queue.clone());
        let executor = EnrichmentExecutor::new(store, self.provider.clone());
        let runner = SequentialRunner::new(queue, executor, self.config.runner.clone());
        runner.run().await
    }
}
