//! # scholarsync-pipeline
//!
//! Ingestion and enrichment pipeline for scholarsync.
//!
//! The pipeline stages, leaves first:
//! - [`extract`] — paginated HTTP fetch of raw postings from the feed
//! - [`transform`] — deterministic normalization (HTML cleanup, dates,
//!   modality/contract heuristics)
//! - [`executor`] — one job through the provider call and confidence gates
//! - [`runner`] — the sequential scheduling loop over the queue
//! - [`sync`] — full-run orchestration with the audit log
//!
//! The `scholarsync` binary wires these from environment configuration.

pub mod executor;
pub mod extract;
pub mod runner;
pub mod sync;
pub mod transform;

pub use executor::{apply_confidence_gates, EnrichmentExecutor};
pub use extract::{FeedConfig, HttpFeedExtractor};
pub use runner::{RunReport, RunnerConfig, SequentialRunner};
pub use sync::{SyncConfig, SyncOrchestrator, SyncReport};
pub use transform::{parse_feed_date, strip_html, transform};
