//! Anthropic messages backend.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{base_url, http_client, status_error, LlmError, TextGenerator};
use crate::config::ProviderSettings;

const PROVIDER: &str = "anthropic";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 2000;

/// Client for `POST {base}/v1/messages`.
#[derive(Clone)]
pub struct AnthropicClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    r#type: String,
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicClient {
    pub fn new(settings: &ProviderSettings, timeout_seconds: u64) -> anyhow::Result<Self> {
        let base_url = base_url(settings);
        tracing::info!(base_url = %base_url, model = %settings.model, "Anthropic client initialized");

        Ok(Self {
            client: http_client(timeout_seconds)?,
            base_url,
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
        })
    }
}

#[async_trait]
impl TextGenerator for AnthropicClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    #[instrument(skip(self, prompt), fields(model = %self.model))]
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/v1/messages", self.base_url);
        debug!(url = %url, "Anthropic request");

        let request = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            temperature: 0.3,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|source| LlmError::Request {
                provider: PROVIDER,
                source,
            })?;

        if !response.status().is_success() {
            return Err(status_error(PROVIDER, response).await);
        }

        let body: MessagesResponse =
            response.json().await.map_err(|e| LlmError::InvalidResponse {
                provider: PROVIDER,
                message: e.to_string(),
            })?;

        // Only a leading text block counts; anything else reads as an empty object
        Ok(body
            .content
            .into_iter()
            .next()
            .filter(|block| block.r#type == "text")
            .and_then(|block| block.text)
            .unwrap_or_else(|| "{}".to_string()))
    }
}
