use std::sync::Arc;

use tracing::{debug, info, warn};

use tawjihi_core::{LlmProvider, LlmRequest, Subject, TawjihiError};

use crate::persona::TutorPersona;

/// Model settings shared by every tutor.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            max_tokens: 2048,
            temperature: 0.7,
        }
    }
}

/// A persona bound to an LLM provider.
pub struct TutorAgent {
    persona: TutorPersona,
    provider: Arc<dyn LlmProvider>,
    settings: GenerationSettings,
    system_prompt: String,
}

impl TutorAgent {
    pub fn new(
        persona: TutorPersona,
        provider: Arc<dyn LlmProvider>,
        settings: GenerationSettings,
    ) -> Self {
        let system_prompt = persona.system_prompt();
        Self {
            persona,
            provider,
            settings,
            system_prompt,
        }
    }

    pub fn persona(&self) -> &TutorPersona {
        &self.persona
    }

    pub fn subject(&self) -> Subject {
        self.persona.subject
    }

    /// Answer one question. The returned text may be empty if the model
    /// produced nothing.
    pub async fn start(&self, question: &str) -> Result<String, TawjihiError> {
        let request = LlmRequest {
            model: self.settings.model.clone(),
            system_prompt: self.system_prompt.clone(),
            user_prompt: question.to_string(),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };

        debug!(tutor = %self.persona.name, provider = %self.provider.name(), "Asking tutor");

        match self.provider.complete(&request).await {
            Ok(response) => {
                info!(
                    tutor = %self.persona.name,
                    provider = %response.provider,
                    tokens = response.tokens_used,
                    latency_ms = response.latency_ms,
                    "Tutor answered"
                );
                Ok(response.content)
            }
            Err(e) => {
                warn!(tutor = %self.persona.name, error = %e, "Provider failed");
                Err(match e.downcast::<TawjihiError>() {
                    Ok(err) => err,
                    Err(e) => TawjihiError::LlmError {
                        provider: self.provider.name().to_string(),
                        message: e.to_string(),
                    },
                })
            }
        }
    }
}
