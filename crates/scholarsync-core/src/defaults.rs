//! Centralized default constants for the scholarsync system.
//!
//! **This module is the single source of truth** for all shared default values.
//! All crates and the ops CLI should reference these constants instead of
//! defining their own magic numbers.
//!
//! Organized by domain area. When adding new constants, place them in the
//! appropriate section and document the rationale for the chosen value.

// =============================================================================
// ENRICHMENT RETRY POLICY
// =============================================================================

/// Number of quick retry attempts before a failed job falls back to the
/// cooldown window. A failed job with `attempt_count` below this value is
/// immediately eligible for reselection.
pub const MAX_QUICK_ATTEMPTS: i32 = 3;

/// Cooldown in hours before a failed job past its quick attempts becomes
/// eligible again. Combined with [`MAX_QUICK_ATTEMPTS`] this yields at most
/// one retry per cooldown window after the quick attempts are spent.
pub const RETRY_COOLDOWN_HOURS: i64 = 24;

/// Default staleness window in hours for operator-driven reclaim of jobs
/// stuck `in_progress` after a crashed run. Comfortably above the per-job
/// timeout so reclaim never races a live attempt.
pub const RECLAIM_STALE_HOURS: i64 = 2;

// =============================================================================
// SEQUENTIAL RUNNER
// =============================================================================

/// Default pause between consecutive jobs in milliseconds. Paces provider
/// calls for vendors that enforce single-concurrent-request limits.
pub const RUNNER_DELAY_MS: u64 = 1000;

/// Default maximum number of jobs processed per runner invocation.
pub const RUNNER_MAX_JOBS: usize = 50;

/// Default per-job wall-clock timeout in seconds. Expiry is treated as a
/// provider failure so a hung call cannot leave a job `in_progress` forever.
pub const RUNNER_JOB_TIMEOUT_SECS: u64 = 120;

// =============================================================================
// CONFIDENCE THRESHOLDS
// =============================================================================

/// Minimum provider confidence for classification-grade groups
/// (keywords, job attributes).
pub const CONFIDENCE_CORE: f32 = 0.5;

/// Minimum provider confidence for speculative groups (details, application,
/// languages, background, geolocation, contact, research areas). Lower on
/// purpose: these are optional enrichments rather than core classification.
pub const CONFIDENCE_SPECULATIVE: f32 = 0.3;

// =============================================================================
// FEED EXTRACTION
// =============================================================================

/// Default records per page requested from the upstream feed.
pub const FEED_PAGE_SIZE: u32 = 50;

/// Default page cap per sync run.
pub const FEED_MAX_PAGES: u32 = 20;

/// Timeout for a single feed page request in seconds.
pub const FEED_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// ENRICHMENT PROVIDERS
// =============================================================================

/// Default Ollama base URL.
pub const OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default enrichment model name (Ollama).
pub const ENRICH_MODEL: &str = "qwen3:8b";

/// Timeout for a single provider enrichment request in seconds.
pub const ENRICH_TIMEOUT_SECS: u64 = 120;

// =============================================================================
// DATABASE POOL
// =============================================================================

/// Default maximum pool connections. The runner is sequential, so the pool
/// mostly serves overlapping operator invocations and integration tests.
pub const POOL_MAX_CONNECTIONS: u32 = 10;

/// Default minimum idle pool connections.
pub const POOL_MIN_CONNECTIONS: u32 = 1;

/// Default pool acquire timeout in seconds.
pub const POOL_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Default idle connection lifetime in seconds (10 minutes).
pub const POOL_IDLE_TIMEOUT_SECS: u64 = 600;

/// Default maximum connection lifetime in seconds (30 minutes).
pub const POOL_MAX_LIFETIME_SECS: u64 = 1800;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_thresholds_ordered() {
        // Runtime check needed for floating point comparison
        assert!(CONFIDENCE_SPECULATIVE < CONFIDENCE_CORE);
        assert!(CONFIDENCE_SPECULATIVE > 0.0);
        assert!(CONFIDENCE_CORE < 1.0);
    }

    #[test]
    fn retry_policy_is_consistent() {
        const {
            assert!(MAX_QUICK_ATTEMPTS > 0);
            assert!(RETRY_COOLDOWN_HOURS > 0);
        }
    }

    #[test]
    fn reclaim_window_exceeds_job_timeout() {
        const {
            assert!(RECLAIM_STALE_HOURS * 3600 > RUNNER_JOB_TIMEOUT_SECS as i64);
        }
    }

    #[test]
    fn runner_defaults_are_positive() {
        const {
            assert!(RUNNER_DELAY_MS > 0);
            assert!(RUNNER_MAX_JOBS > 0);
            assert!(RUNNER_JOB_TIMEOUT_SECS > 0);
        }
    }

    #[test]
    fn pool_sizes_ordered() {
        const {
            assert!(POOL_MIN_CONNECTIONS <= POOL_MAX_CONNECTIONS);
            assert!(POOL_IDLE_TIMEOUT_SECS < POOL_MAX_LIFETIME_SECS);
        }
    }
}
