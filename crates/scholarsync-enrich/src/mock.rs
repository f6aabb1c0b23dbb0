//! Mock enrichment provider for deterministic testing.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use scholarsync_enrich::mock::MockProvider;
//!
//! #[tokio::test]
//! async fn test_with_mock_provider() {
//!     let provider = MockProvider::new()
//!         .with_scripted_data(my_enriched_data)
//!         .with_latency_ms(10);
//!
//!     let data = provider.enrich_job(&job_text).await.unwrap();
//! }
//! ```

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use scholarsync_core::{
    AttributesGroup, EnrichedData, EnrichmentProvider, Error, JobText, KeywordsGroup, Result,
};

/// Mock enrichment provider with scripted output, failure injection, and a
/// call log for assertions.
#[derive(Clone)]
pub struct MockProvider {
    config: Arc<MockConfig>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

#[derive(Debug, Clone)]
struct MockConfig {
    scripted: Option<EnrichedData>,
    latency_ms: u64,
    failure_rate: f64,
    available: bool,
    healthy: bool,
}

/// One logged provider invocation.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub title: String,
    pub timestamp: std::time::Instant,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            scripted: None,
            latency_ms: 0,
            failure_rate: 0.0,
            available: true,
            healthy: true,
        }
    }
}

impl MockProvider {
    /// Create a new mock provider with default configuration.
    pub fn new() -> Self {
        Self {
            config: Arc::new(MockConfig::default()),
            call_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Script the exact [`EnrichedData`] every call returns.
    pub fn with_scripted_data(mut self, data: EnrichedData) -> Self {
        Arc::make_mut(&mut self.config).scripted = Some(data);
        self
    }

    /// Set simulated latency for all calls.
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        Arc::make_mut(&mut self.config).latency_ms = latency_ms;
        self
    }

    /// Set failure rate (0.0 - 1.0) for testing error handling.
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        Arc::make_mut(&mut self.config).failure_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Make `is_available` report false.
    pub fn unavailable(mut self) -> Self {
        Arc::make_mut(&mut self.config).available = false;
        self
    }

    /// Make `health_check` report false.
    pub fn unhealthy(mut self) -> Self {
        Arc::make_mut(&mut self.config).healthy = false;
        self
    }

    /// Get all logged calls for assertion.
    pub fn get_calls(&self) -> Vec<MockCall> {
        self.call_log.lock().unwrap().clone()
    }

    /// Number of enrichment calls made so far.
    pub fn call_count(&self) -> usize {
        self.call_log.lock().unwrap().len()
    }

    /// Clear the call log.
    pub fn clear_calls(&self) {
        self.call_log.lock().unwrap().clear()
    }

    fn should_fail(&self) -> bool {
        use rand::Rng;
        if self.config.failure_rate >= 1.0 {
            return true;
        }
        if self.config.failure_rate > 0.0 {
            rand::thread_rng().gen::<f64>() < self.config.failure_rate
        } else {
            false
        }
    }

    /// Plausible default output derived from the job title, so tests that
    /// don't script data still exercise the confidence-gated write path.
    fn default_data(job: &JobText) -> EnrichedData {
        EnrichedData {
            keywords: Some(KeywordsGroup {
                keywords: job
                    .title
                    .split_whitespace()
                    .take(3)
                    .map(|w| w.to_lowercase())
                    .collect(),
                confidence: 0.9,
            }),
            attributes: Some(AttributesGroup {
                category: Some("academic".to_string()),
                confidence: 0.8,
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EnrichmentProvider for MockProvider {
    async fn enrich_job(&self, job: &JobText) -> Result<EnrichedData> {
        self.call_log.lock().unwrap().push(MockCall {
            title: job.title.clone(),
            timestamp: std::time::Instant::now(),
        });

        if self.config.latency_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(self.config.latency_ms)).await;
        }

        if self.should_fail() {
            return Err(Error::ProviderUnavailable(
                "Simulated failure for testing".to_string(),
            ));
        }

        match &self.config.scripted {
            Some(data) => Ok(data.clone()),
            None => Ok(Self::default_data(job)),
        }
    }

    fn is_available(&self) -> bool {
        self.config.available
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.config.healthy)
    }

    fn name(&self) -> &str {
        "mock"
    }
}
