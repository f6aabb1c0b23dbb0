//! Structured logging schema and field name constants for scholarsync.
//!
//! All crates use these constants for consistent structured logging fields.
//! This ensures log aggregation tools (Loki, Elasticsearch) can query by
//! standardized field names across every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue (failed attempt, rejected group, skipped record) |
//! | INFO  | Lifecycle events (sync start/finish, run summary), claim/terminal transitions |
//! | DEBUG | Decision points, confidence gating outcomes, config choices |
//! | TRACE | Per-record iteration, high-volume data (feed rows, prompt bodies) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "db", "enrich", "pipeline"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "queue", "store", "runner", "executor", "sync", "ollama", "feed", "pool"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "select_next", "mark_enriched", "enrich_one", "fetch_page"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Job posting UUID being operated on.
pub const JOB_ID: &str = "job_id";

/// Sync-log UUID for the current orchestrated run.
pub const SYNC_ID: &str = "sync_id";

/// Canonical source URL of a job posting.
pub const SOURCE_URL: &str = "source_url";

/// Enrichment data group name ("keywords", "attributes", ...).
pub const GROUP: &str = "group";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Attempt counter after the current transition.
pub const ATTEMPT: &str = "attempt";

/// Number of records returned or affected.
pub const RESULT_COUNT: &str = "result_count";

/// Feed page number being fetched.
pub const PAGE: &str = "page";

/// Provider confidence for a data group.
pub const CONFIDENCE: &str = "confidence";

// ─── Database fields ───────────────────────────────────────────────────────

/// Number of active connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Number of idle connections in the pool.
pub const POOL_IDLE: &str = "pool_idle";

// ─── Provider fields ───────────────────────────────────────────────────────

/// Model name used for enrichment.
pub const MODEL: &str = "model";

/// Provider adapter name ("ollama", "openai", "mock").
pub const PROVIDER: &str = "provider";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
