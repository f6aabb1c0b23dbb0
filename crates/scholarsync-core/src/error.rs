//! Error types for scholarsync.

use thiserror::Error;
use uuid::Uuid;

/// Result type alias using scholarsync's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for scholarsync operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Job posting not found
    #[error("Job not found: {0}")]
    JobNotFound(Uuid),

    /// Enrichment provider unreachable or degraded (transport errors,
    /// 5xx responses, provider-side timeouts)
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Provider returned data that fails schema checks
    #[error("Validation error: {0}")]
    Validation(String),

    /// Enrichment of a single job failed; names the failing operation
    #[error("Enrichment failed for job {job_id} during {op}: {message}")]
    Enrichment {
        job_id: Uuid,
        op: &'static str,
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Sync orchestration error
    #[error("Sync error: {0}")]
    Sync(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Validation(e.to_string())
    }
}

/// Blanket HTTP conversion for the feed path. Provider adapters do not rely
/// on it: they map their reqwest errors to [`Error::ProviderUnavailable`]
/// explicitly so failed enrichment attempts stay distinguishable from feed
/// trouble.
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

impl Error {
    /// Wrap any error into an [`Error::Enrichment`] carrying the job id and
    /// the name of the operation that failed.
    pub fn enrichment(job_id: Uuid, op: &'static str, source: impl std::fmt::Display) -> Self {
        Error::Enrichment {
            job_id,
            op,
            message: source.to_string(),
        }
    }
}
