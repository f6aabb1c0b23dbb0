//! # scholarsync-enrich
//!
//! LLM enrichment providers for scholarsync.
//!
//! All providers implement [`scholarsync_core::EnrichmentProvider`] over the
//! shared prompt contract in [`prompt`]:
//! - [`OllamaProvider`] — local Ollama via `/api/chat` (default)
//! - `OpenAiProvider` — OpenAI-compatible `/chat/completions`
//!   (feature `openai`)
//! - `MockProvider` — scripted responses and failure injection for tests
//!   (feature `mock`)

pub mod ollama;
pub mod prompt;

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "mock")]
pub mod mock;

pub use ollama::OllamaProvider;
pub use prompt::{build_user_prompt, parse_provider_response, SYSTEM_PROMPT};

#[cfg(feature = "openai")]
pub use openai::{OpenAiConfig, OpenAiProvider};

#[cfg(feature = "mock")]
pub use mock::MockProvider;
