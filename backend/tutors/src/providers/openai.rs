use std::time::Instant;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use tawjihi_core::{LlmProvider, LlmRequest, LlmResponse};

/// OpenAI-compatible chat completions provider.
///
/// Any server exposing `/chat/completions` works through `with_base_url`.
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    model: Option<String>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: Option<u64>,
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let start = Instant::now();

        let mut messages = Vec::with_capacity(2);
        if !request.system_prompt.is_empty() {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: Some(request.system_prompt.clone()),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: Some(request.user_prompt.clone()),
        });

        let body = ChatRequest {
            model: &request.model,
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        debug!(model = %request.model, base_url = %self.base_url, "Sending chat completion");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("OpenAI HTTP request failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI returned {}: {}", status, error_body);
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI response")?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            provider: "openai".to_string(),
            model: chat_response.model.unwrap_or_else(|| request.model.clone()),
            tokens_used: chat_response
                .usage
                .and_then(|u| u.total_tokens)
                .unwrap_or(0),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}
