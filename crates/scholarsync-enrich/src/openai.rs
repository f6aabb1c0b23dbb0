//! OpenAI-compatible enrichment provider (`/chat/completions`).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use scholarsync_core::{EnrichedData, EnrichmentProvider, Error, JobText, Result};

use crate::prompt::{build_user_prompt, parse_provider_response, SYSTEM_PROMPT};

/// Default OpenAI API endpoint.
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

/// Default generation model.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration for the OpenAI-compatible provider.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Base URL for the API endpoint.
    pub base_url: String,
    /// API key for authentication (optional for local endpoints).
    pub api_key: Option<String>,
    /// Model to use.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OPENAI_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// OpenAI-compatible enrichment provider.
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    /// Create a new provider with the given configuration.
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            subsystem = "enrich",
            component = "openai",
            model = %config.model,
            "Initializing OpenAI provider: url={}",
            config.base_url
        );

        Ok(Self { client, config })
    }

    /// Create from environment variables.
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `OPENAI_BASE_URL` | `https://api.openai.com/v1` | API endpoint |
    /// | `OPENAI_API_KEY` | unset | Bearer token |
    /// | `OPENAI_MODEL` | `gpt-4o-mini` | Model name |
    /// | `OPENAI_TIMEOUT` | `120` | Request timeout (seconds) |
    pub fn from_env() -> Result<Self> {
        let config = OpenAiConfig {
            base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_OPENAI_URL.to_string()),
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            timeout_seconds: std::env::var("OPENAI_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        };
        Self::new(config)
    }

    /// Get the current configuration.
    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    /// Build a POST request with authentication if configured.
    fn build_request(&self, endpoint: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint);
        let mut req = self.client.post(&url);
        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }
        req.header("Content-Type", "application/json")
    }

    fn build_get_request(&self, endpoint: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint);
        let mut req = self.client.get(&url);
        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }
        req
    }
}

#[derive(Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<Message>,
    response_format: ResponseFormat,
}

#[derive(Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[async_trait]
impl EnrichmentProvider for OpenAiProvider {
    #[instrument(skip(self, job), fields(subsystem = "enrich", component = "openai", op = "enrich_job", model = %self.config.model))]
    async fn enrich_job(&self, job: &JobText) -> Result<EnrichedData> {
        let start = Instant::now();

        let request = CompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: build_user_prompt(job),
                },
            ],
            response_format: ResponseFormat {
                format_type: "json_object".to_string(),
            },
        };

        let response = self
            .build_request("/chat/completions")
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::ProviderUnavailable(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ProviderUnavailable(format!(
                "OpenAI returned {}: {}",
                status, body
            )));
        }

        let result: CompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::ProviderUnavailable(format!("Failed to parse response: {}", e)))?;

        let content = result
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::Validation("Response contained no choices".to_string()))?;

        let data = parse_provider_response(&content)?;

        debug!(
            duration_ms = start.elapsed().as_millis() as u64,
            "Enrichment call complete"
        );
        Ok(data)
    }

    fn is_available(&self) -> bool {
        // Hosted OpenAI needs a key; self-hosted compatible endpoints may not.
        self.config.api_key.is_some() || self.config.base_url != DEFAULT_OPENAI_URL
    }

    async fn health_check(&self) -> Result<bool> {
        let response = self
            .build_get_request("/models")
            .timeout(Duration::from_secs(5))
            .send()
            .await;

        match response {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(e) => {
                warn!("OpenAI health check error: {}", e);
                Ok(false)
            }
        }
    }

    fn name(&self) -> &str {
        "openai"
    }
}
