//! HTTP feed extraction.
//!
//! Pulls raw postings page by page from the upstream JSON feed. The feed
//! returns `{"jobs": [...]}` per page; a short or empty page marks the end.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use scholarsync_core::{defaults, Error, JobFeedExtractor, RawJobRecord, Result};

/// Configuration for the HTTP feed extractor.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Base URL of the feed API, without a trailing slash.
    pub base_url: String,
    /// Records requested per page.
    pub page_size: u32,
    /// Page cap per sync run.
    pub max_pages: u32,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl FeedConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `FEED_BASE_URL` | required | Feed API base URL |
    /// | `FEED_PAGE_SIZE` | `50` | Records per page |
    /// | `FEED_MAX_PAGES` | `20` | Page cap per run |
    /// | `FEED_TIMEOUT_SECS` | `30` | Per-request timeout |
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("FEED_BASE_URL")
            .map_err(|_| Error::Config("FEED_BASE_URL is not set".to_string()))?;

        let mut config = Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            page_size: defaults::FEED_PAGE_SIZE,
            max_pages: defaults::FEED_MAX_PAGES,
            timeout_secs: defaults::FEED_TIMEOUT_SECS,
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
        if let Some(secs) = std::env::var("FEED_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.timeout_secs = secs.max(1);
        }

        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let url: String = base_url.into();
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            page_size: defaults::FEED_PAGE_SIZE,
            max_pages: defaults::FEED_MAX_PAGES,
            timeout_secs: defaults::FEED_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FeedPage {
    #[serde(default)]
    jobs: Vec<RawJobRecord>,
}

/// [`JobFeedExtractor`] over the upstream HTTP JSON feed.
pub struct HttpFeedExtractor {
    client: reqwest::Client,
    config: FeedConfig,
}

impl HttpFeedExtractor {
    pub fn new(config: FeedConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(FeedConfig::from_env()?)
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }
}

#[async_trait]
impl JobFeedExtractor for HttpFeedExtractor {
    #[instrument(skip(self), fields(subsystem = "pipeline", component = "extractor", op = "fetch_page"))]
    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<Vec<RawJobRecord>> {
        let url = format!(
            "{}/jobs?page={}&page_size={}",
            self.config.base_url, page, page_size
        );

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| Error::Request(format!("Feed request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Request(format!(
                "Feed returned {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let feed: FeedPage = response
            .json()
            .await
            .map_err(|e| Error::Request(format!("Feed page {} is not valid JSON: {}", page, e)))?;

        debug!(page, count = feed.jobs.len(), "Fetched feed page");
        Ok(feed.jobs)
    }
}
