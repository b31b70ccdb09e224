//! Local Ollama tutor backend.
//!
//! Talks to `POST /api/chat` without streaming. Failures come back as
//! [`TawjihiError::LlmError`] with a hint the operator can act on (a model
//! that still needs `ollama pull`, a server that is not running).

use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use tawjihi_core::{LlmProvider, LlmRequest, LlmResponse, TawjihiError};

const PROVIDER: &str = "ollama";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

pub struct OllamaProvider {
    client: Client,
    base_url: String,
}

impl OllamaProvider {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_OLLAMA_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: Vec<Turn<'a>>,
    stream: bool,
    options: SamplingOptions,
}

#[derive(Debug, Serialize)]
struct Turn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct SamplingOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    message: ReplyMessage,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    eval_count: u64,
    #[serde(default)]
    prompt_eval_count: u64,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Ollama tags never carry a routing prefix such as `openai/`.
fn local_model_name(model: &str) -> &str {
    model.rsplit('/').next().unwrap_or(model)
}

/// The tutor persona goes in as the system turn, the student's question as
/// the only user turn.
fn chat_body(request: &LlmRequest) -> ChatBody<'_> {
    let mut messages = Vec::with_capacity(2);
    if !request.system_prompt.is_empty() {
        messages.push(Turn {
            role: "system",
            content: &request.system_prompt,
        });
    }
    messages.push(Turn {
        role: "user",
        content: &request.user_prompt,
    });

    ChatBody {
        model: local_model_name(&request.model),
        messages,
        stream: false,
        options: SamplingOptions {
            temperature: request.temperature,
            num_predict: request.max_tokens,
        },
    }
}

fn llm_error(message: String) -> anyhow::Error {
    TawjihiError::LlmError {
        provider: PROVIDER.to_string(),
        message,
    }
    .into()
}

/// Turn a non-success reply into an operator-facing message.
fn failure_message(status: StatusCode, body: &str, model: &str) -> String {
    let detail = serde_json::from_str::<ErrorBody>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| body.trim().to_string());

    if status == StatusCode::NOT_FOUND || detail.contains("not found") {
        format!("model '{model}' is not available locally; run `ollama pull {model}` ({detail})")
    } else {
        format!("{status}: {detail}")
    }
}

fn into_response(reply: ChatReply, model: &str, started: Instant) -> LlmResponse {
    if reply.done_reason.as_deref() == Some("length") {
        warn!(model, "Answer cut off at the token limit");
    }
    LlmResponse {
        content: reply.message.content,
        provider: PROVIDER.to_string(),
        model: model.to_string(),
        tokens_used: reply.eval_count + reply.prompt_eval_count,
        latency_ms: started.elapsed().as_millis() as u64,
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let started = Instant::now();
        let body = chat_body(request);
        let model = body.model;
        debug!(model, url = %self.chat_url(), "Sending request to Ollama");

        let response = self
            .client
            .post(self.chat_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                llm_error(format!(
                    "cannot reach Ollama at {} (is `ollama serve` running?): {e}",
                    self.base_url
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(llm_error(failure_message(status, &text, model)));
        }

        let reply: ChatReply = response
            .json()
            .await
            .map_err(|e| llm_error(format!("unreadable reply: {e}")))?;
        Ok(into_response(reply, model, started))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(system_prompt: &str) -> LlmRequest {
        LlmRequest {
            model: "ollama/llama3.1".into(),
            system_prompt: system_prompt.into(),
            user_prompt: "ما هي مشتقة x²؟".into(),
            max_tokens: 512,
            temperature: 0.5,
        }
    }

    #[test]
    fn test_body_carries_persona_question_and_sampling() {
        let req = request("You are MathTutor");
        let body = serde_json::to_value(chat_body(&req)).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "llama3.1",
                "messages": [
                    {"role": "system", "content": "You are MathTutor"},
                    {"role": "user", "content": "ما هي مشتقة x²؟"},
                ],
                "stream": false,
                "options": {"temperature": 0.5, "num_predict": 512},
            })
        );
    }

    #[test]
    fn test_body_skips_empty_system_turn() {
        let req = request("");
        let body = chat_body(&req);
        assert_eq!(body.messages.len(), 1);
        assert_eq!(body.messages[0].role, "user");
    }

    #[test]
    fn test_missing_model_suggests_pull() {
        let msg = failure_message(
            StatusCode::NOT_FOUND,
            r#"{"error":"model \"gpt-4o\" not found, try pulling it first"}"#,
            "gpt-4o",
        );
        assert!(msg.contains("ollama pull gpt-4o"));
        assert!(msg.contains("try pulling it first"));
    }

    #[test]
    fn test_other_failures_keep_status_and_detail() {
        let msg = failure_message(StatusCode::INTERNAL_SERVER_ERROR, "out of memory\n", "llama3.1");
        assert_eq!(msg, "500 Internal Server Error: out of memory");
    }

    #[test]
    fn test_reply_counts_both_token_kinds() {
        let reply: ChatReply = serde_json::from_value(json!({
            "message": {"role": "assistant", "content": "المشتقة 2x"},
            "done_reason": "stop",
            "eval_count": 12,
            "prompt_eval_count": 30,
        }))
        .unwrap();
        let response = into_response(reply, "llama3.1", Instant::now());
        assert_eq!(response.content, "المشتقة 2x");
        assert_eq!(response.tokens_used, 42);
        assert_eq!(response.provider, "ollama");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_llm_error() {
        let provider = OllamaProvider::new().with_base_url("http://127.0.0.1:9/");
        let err = provider.complete(&request("")).await.unwrap_err();
        let err = err.downcast::<TawjihiError>().unwrap();
        assert!(matches!(
            err,
            TawjihiError::LlmError { ref provider, ref message }
                if provider == "ollama" && message.contains("ollama serve")
        ));
    }
}
