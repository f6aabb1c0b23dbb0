//! Ollama enrichment provider.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use scholarsync_core::{defaults, EnrichedData, EnrichmentProvider, Error, JobText, Result};

use crate::prompt::{build_user_prompt, parse_provider_response, SYSTEM_PROMPT};

/// Default Ollama endpoint.
pub const DEFAULT_OLLAMA_URL: &str = defaults::OLLAMA_URL;

/// Default enrichment model.
pub const DEFAULT_MODEL: &str = defaults::ENRICH_MODEL;

/// Timeout for enrichment requests (seconds).
pub const ENRICH_TIMEOUT_SECS: u64 = defaults::ENRICH_TIMEOUT_SECS;

/// Ollama enrichment provider using the `/api/chat` endpoint.
///
/// Uses chat rather than `/api/generate` because chat properly separates
/// thinking/reasoning from the final content on thinking models (qwen3 and
/// friends), which otherwise leak chain-of-thought into the JSON body.
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
    timeout_secs: u64,
}

impl OllamaProvider {
    /// Create a new Ollama provider with default settings.
    pub fn new() -> Self {
        Self::with_config(DEFAULT_OLLAMA_URL.to_string(), DEFAULT_MODEL.to_string())
    }

    /// Create a new Ollama provider with custom endpoint and model.
    pub fn with_config(base_url: String, model: String) -> Self {
        let timeout_secs = std::env::var("ENRICH_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(ENRICH_TIMEOUT_SECS);

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        info!(
            subsystem = "enrich",
            component = "ollama",
            model = %model,
            "Initializing Ollama provider: url={}",
            base_url
        );

        Self {
            client,
            base_url,
            model,
            timeout_secs,
        }
    }

    /// Create from environment variables.
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `OLLAMA_URL` | `http://127.0.0.1:11434` | Ollama endpoint |
    /// | `ENRICH_MODEL` | `qwen3:8b` | Model name |
    /// | `ENRICH_TIMEOUT_SECS` | `120` | Request timeout |
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("OLLAMA_URL").unwrap_or_else(|_| DEFAULT_OLLAMA_URL.to_string());
        let model = std::env::var("ENRICH_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Self::with_config(base_url, model)
    }

    /// The configured model name.
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Chat API message for `/api/chat`.
#[derive(Serialize, Deserialize, Clone)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Request payload for the Ollama `/api/chat` endpoint.
#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    /// Ollama format enforcement. Set to `"json"` for guaranteed valid JSON output.
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<serde_json::Value>,
    /// Disable thinking/reasoning for models that support it. When `false`,
    /// suppresses chain-of-thought in the response.
    #[serde(skip_serializing_if = "Option::is_none")]
    think: Option<bool>,
}

/// Response from the Ollama `/api/chat` endpoint.
#[derive(Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[async_trait]
impl EnrichmentProvider for OllamaProvider {
    #[instrument(skip(self, job), fields(subsystem = "enrich", component = "ollama", op = "enrich_job", model = %self.model))]
    async fn enrich_job(&self, job: &JobText) -> Result<EnrichedData> {
        let start = Instant::now();

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: build_user_prompt(job),
                },
            ],
            stream: false,
            format: Some(serde_json::json!("json")),
            think: Some(false),
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .timeout(Duration::from_secs(self.timeout_secs))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::ProviderUnavailable(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ProviderUnavailable(format!(
                "Ollama returned {}: {}",
                status, body
            )));
        }

        let result: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::ProviderUnavailable(format!("Failed to parse response: {}", e)))?;

        let data = parse_provider_response(&result.message.content)?;

        let elapsed = start.elapsed().as_millis() as u64;
        debug!(duration_ms = elapsed, "Enrichment call complete");
        if elapsed > 30000 {
            warn!(duration_ms = elapsed, slow = true, "Slow enrichment call");
        }
        Ok(data)
    }

    fn is_available(&self) -> bool {
        !self.base_url.is_empty() && !self.model.is_empty()
    }

    async fn health_check(&self) -> Result<bool> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(Duration::from_secs(5))
            .send()
            .await;

        match response {
            Ok(resp) => {
                if resp.status().is_success() {
                    info!("Ollama health check passed");
                    Ok(true)
                } else {
                    warn!("Ollama health check failed: {}", resp.status());
                    Ok(false)
                }
            }
            Err(e) => {
                warn!("Ollama health check error: {}", e);
                Ok(false)
            }
        }
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_constants() {
        assert_eq!(DEFAULT_OLLAMA_URL, "http://127.0.0.1:11434");
        assert_eq!(DEFAULT_MODEL, "qwen3:8b");
        assert_eq!(ENRICH_TIMEOUT_SECS, 120);
    }

    #[test]
    fn test_default_config() {
        let provider = OllamaProvider::new();
        assert_eq!(provider.base_url, DEFAULT_OLLAMA_URL);
        assert_eq!(provider.model(), DEFAULT_MODEL);
        assert!(provider.is_available());
        assert_eq!(provider.name(), "ollama");
    }

    #[test]
    fn test_custom_config() {
        let provider =
            OllamaProvider::with_config("http://custom:1234".to_string(), "llama3".to_string());
        assert_eq!(provider.base_url, "http://custom:1234");
        assert_eq!(provider.model(), "llama3");
    }

    #[test]
    fn test_empty_model_is_not_available() {
        let provider = OllamaProvider::with_config("http://test".to_string(), String::new());
        assert!(!provider.is_available());
    }

    #[test]
    fn test_chat_request_serialization() {
        let request = ChatRequest {
            model: "qwen3:8b".to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: "Extract fields".to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: "Job title: Lecturer".to_string(),
                },
            ],
            stream: false,
            format: Some(serde_json::json!("json")),
            think: Some(false),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"format\":\"json\""));
        assert!(json.contains("\"think\":false"));
        assert!(json.contains("\"role\":\"system\""));
        assert!(json.contains("\"stream\":false"));
    }

    #[test]
    fn test_chat_request_omits_none_fields() {
        let request = ChatRequest {
            model: "m".to_string(),
            messages: vec![],
            stream: false,
            format: None,
            think: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("format"));
        assert!(!json.contains("think"));
    }

    #[test]
    fn test_chat_response_deserialization() {
        let json = r#"{"message": {"role": "assistant", "content": "{}"}, "done": true}"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.message.content, "{}");
    }
}
