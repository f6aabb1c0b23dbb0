//! Sequential enrichment runner.
//!
//! The scheduling loop: pulls claims from the queue one at a time, invokes
//! the executor under a per-job timeout, and applies the configured pacing
//! and error policy. Sequential on purpose: local LLM backends serve one
//! request at a time, so concurrency here would only queue inside the
//! provider.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::{sleep, timeout};
use tracing::{info, instrument, warn};

use scholarsync_core::{
    defaults, EnrichmentProgress, EnrichmentProvider, EnrichmentQueue, Error, JobStore, Result,
};

use crate::executor::EnrichmentExecutor;

/// Configuration for the sequential runner.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Pause between consecutive jobs in milliseconds.
    pub delay_between_jobs_ms: u64,
    /// Maximum number of jobs processed per invocation.
    pub max_jobs_per_run: usize,
    /// Keep going after a failed job instead of aborting the run.
    pub continue_on_error: bool,
    /// Per-job wall-clock timeout in seconds. Expiry counts as a failure.
    pub job_timeout_secs: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            delay_between_jobs_ms: defaults::RUNNER_DELAY_MS,
            max_jobs_per_run: defaults::RUNNER_MAX_JOBS,
            continue_on_error: true,
            job_timeout_secs: defaults::RUNNER_JOB_TIMEOUT_SECS,
        }
    }
}

impl RunnerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `ENRICH_DELAY_MS` | `1000` | Pause between jobs |
    /// | `ENRICH_MAX_JOBS` | `50` | Jobs per run |
    /// | `ENRICH_CONTINUE_ON_ERROR` | `true` | Keep going after failures |
    /// | `ENRICH_JOB_TIMEOUT_SECS` | `120` | Per-job timeout |
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(ms) = std::env::var("ENRICH_DELAY_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.delay_between_jobs_ms = ms;
        }
        if let Some(n) = std::env::var("ENRICH_MAX_JOBS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
        {
            config.max_jobs_per_run = n.max(1);
        }
        if let Ok(v) = std::env::var("ENRICH_CONTINUE_ON_ERROR") {
            config.continue_on_error = v != "false" && v != "0";
        }
        if let Some(secs) = std::env::var("ENRICH_JOB_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.job_timeout_secs = secs.max(1);
        }

        config
    }

    /// Set the pause between jobs.
    pub fn with_delay_ms(mut self, ms: u64) -> Self {
        self.delay_between_jobs_ms = ms;
        self
    }

    /// Set the per-run job cap.
    pub fn with_max_jobs(mut self, max: usize) -> Self {
        self.max_jobs_per_run = max;
        self
    }

    /// Set the error policy.
    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    /// Set the per-job timeout.
    pub fn with_job_timeout_secs(mut self, secs: u64) -> Self {
        self.job_timeout_secs = secs;
        self
    }
}

/// Statistics for one runner invocation.
///
/// `processed` counts every claim taken from the queue, successful or not,
/// so operators can reconcile it against the final queue snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub processed: usize,
    pub enriched: usize,
    pub failed: usize,
    pub duration_ms: u64,
    /// Queue-wide counts taken after the loop finished.
    pub snapshot: EnrichmentProgress,
}

/// Sequential enrichment runner over a queue and an executor.
pub struct SequentialRunner<Q: ?Sized, S: ?Sized, P: ?Sized> {
    queue: Arc<Q>,
    executor: EnrichmentExecutor<S, P>,
    config: RunnerConfig,
}

impl<Q, S, P> SequentialRunner<Q, S, P>
where
    Q: EnrichmentQueue + ?Sized,
    S: JobStore + ?Sized,
    P: EnrichmentProvider + ?Sized,
{
    pub fn new(queue: Arc<Q>, executor: EnrichmentExecutor<S, P>, config: RunnerConfig) -> Self {
        Self {
            queue,
            executor,
            config,
        }
    }

    /// Process eligible jobs until the queue is empty or the per-run cap is
    /// reached.
    ///
    /// Each claim ends in exactly one terminal transition: `mark_enriched`
    /// on success, `mark_failed` on executor error or timeout. A failure of
    /// the `mark_failed` write itself propagates out uncaught; with
    /// `continue_on_error = false` the first job failure aborts the run with
    /// its error after the failure is recorded.
    #[instrument(skip(self), fields(subsystem = "pipeline", component = "runner", op = "run"))]
    pub async fn run(&self) -> Result<RunReport> {
        let start = Instant::now();
        let mut report = RunReport::default();
        let job_timeout = Duration::from_secs(self.config.job_timeout_secs);

        info!(
            max_jobs = self.config.max_jobs_per_run,
            delay_ms = self.config.delay_between_jobs_ms,
            continue_on_error = self.config.continue_on_error,
            "Enrichment run started"
        );

        while report.processed < self.config.max_jobs_per_run {
            let Some(job) = self.queue.select_next().await? else {
                break;
            };
            report.processed += 1;

            let result = match timeout(job_timeout, self.executor.enrich_one(job.id)).await {
                Ok(result) => result,
                Err(_) => Err(Error::enrichment(
                    job.id,
                    "job_timeout",
                    format!("exceeded {}s", self.config.job_timeout_secs),
                )),
            };

            match result {
                Ok(()) => {
                    self.queue.mark_enriched(job.id).await?;
                    report.enriched += 1;
                }
                Err(e) => {
                    warn!(
                        job_id = %job.id,
                        attempt = job.attempt_count,
                        error_msg = %e,
                        "Enrichment attempt failed"
                    );
                    self.queue.mark_failed(job.id, &e.to_string()).await?;
                    report.failed += 1;
                    if !self.config.continue_on_error {
                        return Err(e);
                    }
                }
            }

            if report.processed < self.config.max_jobs_per_run
                && self.config.delay_between_jobs_ms > 0
            {
                sleep(Duration::from_millis(self.config.delay_between_jobs_ms)).await;
            }
        }

        report.snapshot = self.queue.progress_snapshot().await?;
        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            processed = report.processed,
            enriched = report.enriched,
            failed = report.failed,
            duration_ms = report.duration_ms,
            "Enrichment run finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration as ChronoDuration, Utc};
    use scholarsync_core::{
        ClaimedJob, EnrichedData, EnrichedFieldUpdate, EnrichmentProgress, JobRecord,
        JobStatusSummary, JobText, LanguageRequirement, LoadOutcome, NewJobRecord,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use uuid::Uuid;

    /// In-memory queue fake handing out a fixed list of claims and counting
    /// every call for spy assertions.
    struct FakeQueue {
        jobs: Mutex<Vec<Uuid>>,
        select_calls: AtomicUsize,
        enriched: Mutex<Vec<Uuid>>,
        failed: Mutex<Vec<(Uuid, String)>>,
    }

    impl FakeQueue {
        fn with_jobs(count: usize) -> Self {
            Self {
                jobs: Mutex::new((0..count).map(|_| Uuid::new_v4()).collect()),
                select_calls: AtomicUsize::new(0),
                enriched: Mutex::new(Vec::new()),
                failed: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl EnrichmentQueue for FakeQueue {
        async fn select_next(&self) -> Result<Option<ClaimedJob>> {
            self.select_calls.fetch_add(1, Ordering::SeqCst);
            let mut jobs = self.jobs.lock().unwrap();
            if jobs.is_empty() {
                return Ok(None);
            }
            let id = jobs.remove(0);
            Ok(Some(ClaimedJob {
                id,
                source_url: format!("https://example.edu/jobs/{}", id),
                title: "Lecturer".to_string(),
                attempt_count: 1,
                last_attempt_at: Utc::now(),
            }))
        }
        async fn mark_enriched(&self, id: Uuid) -> Result<()> {
            self.enriched.lock().unwrap().push(id);
            Ok(())
        }
        async fn mark_failed(&self, id: Uuid, error: &str) -> Result<()> {
            self.failed.lock().unwrap().push((id, error.to_string()));
            Ok(())
        }
        async fn reset_to_pending(&self, _id: Uuid) -> Result<()> {
            Ok(())
        }
        async fn progress_snapshot(&self) -> Result<EnrichmentProgress> {
            Ok(EnrichmentProgress::default())
        }
        async fn reclaim_stale(&self, _stale_after: ChronoDuration) -> Result<u64> {
            Ok(0)
        }
    }

    /// Store fake: always returns text, records nothing.
    struct FakeStore;

    #[async_trait]
    impl scholarsync_core::JobStore for FakeStore {
        async fn insert(&self, _record: NewJobRecord) -> Result<Uuid> {
            unimplemented!()
        }
        async fn upsert(&self, _record: NewJobRecord) -> Result<LoadOutcome> {
            unimplemented!()
        }
        async fn get(&self, _id: Uuid) -> Result<Option<JobRecord>> {
            unimplemented!()
        }
        async fn find_by_source_url(&self, _source_url: &str) -> Result<Option<JobRecord>> {
            unimplemented!()
        }
        async fn job_text(&self, _id: Uuid) -> Result<JobText> {
            Ok(JobText {
                title: "Lecturer".to_string(),
                description: "Teach.".to_string(),
                qualifications: None,
                salary: None,
                instructions: None,
            })
        }
        async fn update_enrichment_fields(
            &self,
            _id: Uuid,
            _update: EnrichedFieldUpdate,
        ) -> Result<()> {
            Ok(())
        }
        async fn language_requirements(&self, _id: Uuid) -> Result<Vec<LanguageRequirement>> {
            Ok(vec![])
        }
        async fn progress(&self, _active_only: bool) -> Result<EnrichmentProgress> {
            Ok(EnrichmentProgress::default())
        }
        async fn list_statuses(&self) -> Result<Vec<JobStatusSummary>> {
            Ok(vec![])
        }
        async fn mark_expired_before(&self, _cutoff: DateTime<Utc>) -> Result<u64> {
            Ok(0)
        }
    }

    /// Provider fake with a scripted pass/fail sequence and optional hang.
    struct FakeProvider {
        failures_first: usize,
        calls: AtomicUsize,
        hang: bool,
    }

    impl FakeProvider {
        fn ok() -> Self {
            Self {
                failures_first: 0,
                calls: AtomicUsize::new(0),
                hang: false,
            }
        }
        fn failing_first(n: usize) -> Self {
            Self {
                failures_first: n,
                calls: AtomicUsize::new(0),
                hang: false,
            }
        }
        fn hanging() -> Self {
            Self {
                failures_first: 0,
                calls: AtomicUsize::new(0),
                hang: true,
            }
        }
    }

    #[async_trait]
    impl EnrichmentProvider for FakeProvider {
        async fn enrich_job(&self, _job: &JobText) -> Result<EnrichedData> {
            if self.hang {
                // Far longer than any test timeout
                sleep(Duration::from_secs(3600)).await;
            }
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures_first {
                return Err(Error::ProviderUnavailable("scripted failure".to_string()));
            }
            Ok(EnrichedData::default())
        }
        fn is_available(&self) -> bool {
            true
        }
        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
        fn name(&self) -> &str {
            "fake"
        }
    }

    fn runner(
        queue: Arc<FakeQueue>,
        provider: FakeProvider,
        config: RunnerConfig,
    ) -> SequentialRunner<FakeQueue, FakeStore, FakeProvider> {
        let executor = EnrichmentExecutor::new(Arc::new(FakeStore), Arc::new(provider));
        SequentialRunner::new(queue, executor, config)
    }

    #[tokio::test]
    async fn run_stops_at_max_jobs_per_run() {
        // Five eligible jobs, cap of two: exactly two claims.
        let queue = Arc::new(FakeQueue::with_jobs(5));
        let config = RunnerConfig::default().with_max_jobs(2).with_delay_ms(0);
        let report = runner(queue.clone(), FakeProvider::ok(), config)
            .run()
            .await
            .unwrap();

        assert_eq!(report.processed, 2);
        assert_eq!(report.enriched, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(queue.select_calls.load(Ordering::SeqCst), 2);
        assert_eq!(queue.enriched.lock().unwrap().len(), 2);
        assert_eq!(queue.jobs.lock().unwrap().len(), 3, "three left unclaimed");
    }

    #[tokio::test]
    async fn run_drains_queue_when_under_cap() {
        let queue = Arc::new(FakeQueue::with_jobs(3));
        let config = RunnerConfig::default().with_max_jobs(50).with_delay_ms(0);
        let report = runner(queue.clone(), FakeProvider::ok(), config)
            .run()
            .await
            .unwrap();

        assert_eq!(report.processed, 3);
        // One extra select_next observed the empty queue.
        assert_eq!(queue.select_calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn abort_on_first_error_never_selects_again() {
        let queue = Arc::new(FakeQueue::with_jobs(3));
        let config = RunnerConfig::default()
            .with_max_jobs(10)
            .with_delay_ms(0)
            .with_continue_on_error(false);
        let result = runner(queue.clone(), FakeProvider::failing_first(5), config)
            .run()
            .await;

        assert!(matches!(result, Err(Error::Enrichment { .. })));
        // The failure is recorded before the abort; no second claim happens.
        assert_eq!(queue.select_calls.load(Ordering::SeqCst), 1);
        assert_eq!(queue.failed.lock().unwrap().len(), 1);
        assert!(queue.enriched.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn continue_on_error_processes_the_rest() {
        let queue = Arc::new(FakeQueue::with_jobs(3));
        let config = RunnerConfig::default().with_max_jobs(10).with_delay_ms(0);
        let report = runner(queue.clone(), FakeProvider::failing_first(1), config)
            .run()
            .await
            .unwrap();

        assert_eq!(report.processed, 3);
        assert_eq!(report.failed, 1);
        assert_eq!(report.enriched, 2);
        let failed = queue.failed.lock().unwrap();
        assert_eq!(failed.len(), 1);
        assert!(failed[0].1.contains("scripted failure"));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_provider_times_out_as_failure() {
        let queue = Arc::new(FakeQueue::with_jobs(1));
        let config = RunnerConfig::default()
            .with_max_jobs(1)
            .with_delay_ms(0)
            .with_job_timeout_secs(5);
        let report = runner(queue.clone(), FakeProvider::hanging(), config)
            .run()
            .await
            .unwrap();

        assert_eq!(report.processed, 1);
        assert_eq!(report.failed, 1);
        let failed = queue.failed.lock().unwrap();
        assert!(failed[0].1.contains("job_timeout"));
        assert!(failed[0].1.contains("exceeded 5s"));
    }

    #[tokio::test(start_paused = true)]
    async fn delay_is_applied_between_jobs_but_not_after_last() {
        let queue = Arc::new(FakeQueue::with_jobs(2));
        let config = RunnerConfig::default().with_max_jobs(2).with_delay_ms(1000);
        let start = tokio::time::Instant::now();
        let report = runner(queue, FakeProvider::ok(), config).run().await.unwrap();

        assert_eq!(report.processed, 2);
        // One inter-job delay only (virtual time).
        assert_eq!(start.elapsed(), Duration::from_millis(1000));
    }

    #[test]
    fn config_defaults() {
        let config = RunnerConfig::default();
        assert_eq!(config.delay_between_jobs_ms, 1000);
        assert_eq!(config.max_jobs_per_run, 50);
        assert!(config.continue_on_error);
        assert_eq!(config.job_timeout_secs, 120);
    }

    #[test]
    fn config_builders() {
        let config = RunnerConfig::default()
            .with_delay_ms(10)
            .with_max_jobs(2)
            .with_continue_on_error(false)
            .with_job_timeout_secs(7);
        assert_eq!(config.delay_between_jobs_ms, 10);
        assert_eq!(config.max_jobs_per_run, 2);
        assert!(!config.continue_on_error);
        assert_eq!(config.job_timeout_secs, 7);
    }
}
