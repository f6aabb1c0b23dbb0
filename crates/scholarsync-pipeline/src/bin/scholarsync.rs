//! Scholarsync Ops CLI
//!
//! Batch entry point for the ingestion and enrichment pipeline.
//!
//! Usage:
//!   cargo run --bin scholarsync -- sync
//!   cargo run --bin scholarsync -- enrich --max-jobs 10
//!   cargo run --bin scholarsync -- status
//!   cargo run --bin scholarsync -- reset <job-id>
//!   cargo run --bin scholarsync -- reclaim --hours 2

use std::env;
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use scholarsync_core::{defaults, EnrichmentProvider, EnrichmentQueue, JobStore};
use scholarsync_db::Database;
use scholarsync_enrich::OllamaProvider;
use scholarsync_pipeline::{
    EnrichmentExecutor, HttpFeedExtractor, RunnerConfig, SequentialRunner, SyncConfig,
    SyncOrchestrator,
};

#[derive(Debug)]
enum Command {
    Sync,
    Enrich,
    Status,
    Reset(Uuid),
    Reclaim { hours: i64 },
}

#[derive(Debug)]
struct Args {
    command: Command,
    max_jobs: Option<usize>,
}

fn parse_args() -> anyhow::Result<Args> {
    let args: Vec<String> = env::args().collect();

    let Some(command_name) = args.get(1) else {
        print_help();
        std::process::exit(0);
    };

    let mut command = match command_name.as_str() {
        "sync" => Command::Sync,
        "enrich" => Command::Enrich,
        "status" => Command::Status,
        "reset" => {
            let raw = args
                .get(2)
                .context("reset requires a job id: scholarsync reset <job-id>")?;
            let id = Uuid::parse_str(raw).with_context(|| format!("invalid job id: {}", raw))?;
            Command::Reset(id)
        }
        "reclaim" => Command::Reclaim {
            hours: defaults::RECLAIM_STALE_HOURS,
        },
        "--help" | "-h" | "help" => {
            print_help();
            std::process::exit(0);
        }
        other => bail!("Unknown command: {}. Try --help.", other),
    };

    let mut max_jobs = None;
    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--max-jobs" | "-n" => {
                i += 1;
                if i < args.len() {
                    max_jobs = Some(
                        args[i]
                            .parse::<usize>()
                            .with_context(|| format!("invalid --max-jobs: {}", args[i]))?,
                    );
                }
            }
            "--hours" => {
                i += 1;
                if i < args.len() {
                    let hours = args[i]
                        .parse::<i64>()
                        .with_context(|| format!("invalid --hours: {}", args[i]))?;
                    if let Command::Reclaim { hours: h } = &mut command {
                        *h = hours;
                    }
                }
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {}
        }
        i += 1;
    }

    Ok(Args { command, max_jobs })
}

fn print_help() {
    println!(
        r#"
Scholarsync Ops CLI

Usage: scholarsync <COMMAND> [OPTIONS]

Commands:
  sync               Full run: fetch feed, load records, expire, enrich
  enrich             Enrichment phase only (drain the queue)
  status             Enrichment progress, per-job statuses, recent sync runs
  reset <job-id>     Reset one job to pending, clearing attempts
  reclaim            Move stale in-progress jobs back to the retry path

Options:
  -n, --max-jobs <N>   Cap jobs per enrich/sync run (default: {max_jobs})
      --hours <H>      Staleness window for reclaim (default: {reclaim})
  -h, --help           Print help

Environment:
  DATABASE_URL         PostgreSQL connection string (required)
  FEED_BASE_URL        Feed API base URL (required for sync)
  ENRICH_PROVIDER      ollama (default) or openai (feature "openai")
  OLLAMA_URL           Ollama base URL (default: {ollama})
  ENRICH_MODEL         Model name (default: {model})
  RUST_LOG             Log filter (default: info)
"#,
        max_jobs = defaults::RUNNER_MAX_JOBS,
        reclaim = defaults::RECLAIM_STALE_HOURS,
        ollama = defaults::OLLAMA_URL,
        model = defaults::ENRICH_MODEL,
    );
}

fn build_provider() -> anyhow::Result<Arc<dyn EnrichmentProvider>> {
    let provider_name =
        env::var("ENRICH_PROVIDER").unwrap_or_else(|_| "ollama".to_string());

    match provider_name.as_str() {
        "ollama" => Ok(Arc::new(OllamaProvider::from_env())),
        #[cfg(feature = "openai")]
        "openai" => Ok(Arc::new(scholarsync_enrich::OpenAiProvider::from_env()?)),
        other => bail!(
            "Unknown ENRICH_PROVIDER: {} (expected ollama{})",
            other,
            if cfg!(feature = "openai") {
                " or openai"
            } else {
                "; rebuild with the openai feature for openai"
            }
        ),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = parse_args()?;

    let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
    let db = Database::connect(&database_url).await?;
    db.migrate().await?;

    match args.command {
        Command::Sync => {
            let extractor = HttpFeedExtractor::from_env()?;
            let provider = build_provider()?;
            let mut config = SyncConfig::from_env();
            if let Some(max_jobs) = args.max_jobs {
                config.runner = config.runner.with_max_jobs(max_jobs);
            }

            let orchestrator = SyncOrchestrator::new(db, extractor, provider, config);
            let report = orchestrator.run().await?;

            println!("Sync {} completed.", report.sync_log_id);
            println!(
                "  pages: {}  fetched: {}  inserted: {}  updated: {}  skipped: {}  expired: {}",
                report.totals.pages_fetched,
                report.totals.records_fetched,
                report.totals.records_inserted,
                report.totals.records_updated,
                report.totals.records_skipped,
                report.totals.records_expired,
            );
            if let Some(run) = report.enrichment {
                println!(
                    "  enrichment: processed {}  enriched {}  failed {}  in {} ms",
                    run.processed, run.enriched, run.failed, run.duration_ms
                );
            }
        }
        Command::Enrich => {
            let provider = build_provider()?;
            if !provider.health_check().await.unwrap_or(false) {
                bail!("Provider '{}' failed its health check", provider.name());
            }
            info!(provider = provider.name(), "Provider healthy");

            let mut config = RunnerConfig::from_env();
            if let Some(max_jobs) = args.max_jobs {
                config = config.with_max_jobs(max_jobs);
            }

            let executor = EnrichmentExecutor::new(Arc::new(db.jobs.clone()), provider);
            let runner = SequentialRunner::new(Arc::new(db.queue.clone()), executor, config);
            let report = runner.run().await?;

            println!(
                "Enrichment run: processed {}  enriched {}  failed {}  in {} ms",
                report.processed, report.enriched, report.failed, report.duration_ms
            );
        }
        Command::Status => {
            let progress = db.queue.progress_snapshot().await?;
            println!(
                "Enrichment progress (active postings): total {}  pending {}  in_progress {}  enriched {}  failed {}",
                progress.total,
                progress.pending,
                progress.in_progress,
                progress.enriched,
                progress.failed,
            );

            let statuses = db.jobs.list_statuses().await?;
            println!("\nJobs ({}):", statuses.len());
            for summary in statuses.iter().take(25) {
                println!(
                    "  {}  {:<12} {:<12} attempts={}  {}",
                    summary.id,
                    summary.status.to_string(),
                    summary.enrichment_status.to_string(),
                    summary.attempt_count,
                    summary.title,
                );
                if let Some(error) = &summary.error {
                    println!("      last error: {}", error);
                }
            }

            let runs = db.sync_log.list_recent(5).await?;
            println!("\nRecent sync runs:");
            for run in runs {
                println!(
                    "  {}  {}  started {}  inserted {}  updated {}  enriched {}  failed {}",
                    run.id,
                    run.status,
                    run.started_at.format("%Y-%m-%d %H:%M:%S"),
                    run.records_inserted,
                    run.records_updated,
                    run.enriched_count,
                    run.failed_count,
                );
            }
        }
        Command::Reset(id) => {
            db.queue.reset_to_pending(id).await?;
            println!("Job {} reset to pending.", id);
        }
        Command::Reclaim { hours } => {
            let reclaimed = db.queue.reclaim_stale(Duration::hours(hours)).await?;
            println!(
                "Reclaimed {} stale in-progress job(s) older than {}h.",
                reclaimed, hours
            );
        }
    }

    Ok(())
}
