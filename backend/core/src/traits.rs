use anyhow::Result;
use async_trait::async_trait;

/// Trait for LLM providers backing the tutor personas.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., "openai", "ollama").
    fn name(&self) -> &str;

    /// Send a completion request and return the response text.
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse>;
}

/// Request to an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Response from an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub provider: String,
    pub model: String,
    pub tokens_used: u64,
    pub latency_ms: u64,
}
