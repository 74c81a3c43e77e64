//! Text-generation providers used for pricing research.
//!
//! Both backends honour the same contract: one prompt in, raw text out. The
//! research orchestrator only ever sees `dyn TextGenerator`.

mod anthropic;
mod openai;

pub use anthropic::AnthropicClient;
pub use openai::OpenAiClient;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;

use crate::config::{ProviderSettings, Settings};
use crate::domain::ai::AiProvider;

/// Errors from a provider call.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("{provider} request failed: {source}")]
    Request {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} returned {status}: {message}")]
    Status {
        provider: &'static str,
        status: StatusCode,
        message: String,
    },

    #[error("{provider} returned an unreadable response: {message}")]
    InvalidResponse {
        provider: &'static str,
        message: String,
    },
}

/// Prompt in, raw text out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &'static str;
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

/// The configured providers, looked up by selector.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<AiProvider, Arc<dyn TextGenerator>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every provider that has an API key configured.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let mut registry = Self::new();

        if let Some(openai) = &settings.openai {
            registry.register(
                AiProvider::Openai,
                Arc::new(OpenAiClient::new(openai, settings.ai_timeout_seconds)?),
            );
        }
        if let Some(anthropic) = &settings.anthropic {
            registry.register(
                AiProvider::Anthropic,
                Arc::new(AnthropicClient::new(anthropic, settings.ai_timeout_seconds)?),
            );
        }

        Ok(registry)
    }

    pub fn register(&mut self, provider: AiProvider, generator: Arc<dyn TextGenerator>) {
        tracing::info!(provider = provider.as_str(), "AI provider registered");
        self.providers.insert(provider, generator);
    }

    pub fn get(&self, provider: AiProvider) -> Option<Arc<dyn TextGenerator>> {
        self.providers.get(&provider).cloned()
    }

    pub fn is_configured(&self, provider: AiProvider) -> bool {
        self.providers.contains_key(&provider)
    }
}

/// Shared HTTP client construction for provider backends.
pub(crate) fn http_client(timeout_seconds: u64) -> anyhow::Result<Client> {
    use anyhow::Context;

    Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .build()
        .context("Failed to create HTTP client")
}

/// Build the error for a non-success response, preferring the provider's own message.
pub(crate) async fn status_error(provider: &'static str, response: reqwest::Response) -> LlmError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            if body.is_empty() {
                status.to_string()
            } else {
                body.chars().take(500).collect()
            }
        });

    tracing::error!(provider, status = %status, message = %message, "AI provider error");

    LlmError::Status {
        provider,
        status,
        message,
    }
}

pub(crate) fn base_url(settings: &ProviderSettings) -> String {
    settings.base_url.trim_end_matches('/').to_string()
}
