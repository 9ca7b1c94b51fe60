//! LLM client for OpenAI-compatible chat completion APIs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the LLM client
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// API base URL
    pub base_url: String,
    /// Model name
    pub model: String,
    /// API key (optional for local endpoints)
    pub api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o".to_string(),
            api_key: None,
        }
    }
}

/// A message in the chat conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Client for chat completion requests
pub struct Client {
    config: LlmConfig,
    client: reqwest::Client,
}

impl Client {
    /// Create a new LLM client
    pub fn new(config: LlmConfig) -> Self {
        let mut config = config;
        config.base_url = config.base_url.trim_end_matches('/').to_string();

        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Send a chat completion request and return the response content
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.config.base_url);

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: messages.to_vec(),
        };

        let mut builder = self.client.post(&url).json(&request);
        if let Some(ref key) = self.config.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = builder
            .send()
            .await
            .context("failed to send request to LLM API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("LLM API error (status {}): {}", status, body);
        }

        let result: ChatResponse = response
            .json()
            .await
            .context("failed to parse LLM response")?;

        if let Some(error) = result.error {
            anyhow::bail!("LLM API error: {}", error.message);
        }

        result
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .context("no choices in LLM response")
    }

    /// Send a chat completion request, retrying with backoff
    pub async fn complete_with_retry(
        &self,
        messages: &[ChatMessage],
        max_retries: usize,
    ) -> Result<String> {
        let mut last_error = None;

        for attempt in 0..max_retries {
            match self.complete(messages).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    tracing::warn!("LLM request failed (attempt {}): {}", attempt + 1, e);
                    last_error = Some(e);

                    tokio::time::sleep(tokio::time::Duration::from_millis(
                        500 * (attempt as u64 + 1),
                    ))
                    .await;
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("no attempts made")))
    }

    /// The configured model name
    pub fn model(&self) -> &str {
        &self.config.model
    }
}

// OpenAI-compatible API types

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}
