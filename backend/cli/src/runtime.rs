//! Builds the runtime components from a prepared config.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tawjihi_config::defaults::{DEFAULT_TESSERACT_CMD, DEFAULT_UPLOAD_DIR};
use tawjihi_config::schema::{DatabaseConfig, LlmConfig, OcrConfig, UploadsConfig};
use tawjihi_config::{LlmProviderKind, TawjihiConfig};
use tawjihi_core::LlmProvider;
use tawjihi_gateway::GatewayState;
use tawjihi_media::FileHandler;
use tawjihi_memory::{InMemoryStore, MemoryStore, SupabaseStore, TawjihiMemory};
use tawjihi_tutors::providers::{MockProvider, OllamaProvider, OpenAiProvider};
use tawjihi_tutors::{GenerationSettings, TutorRegistry};
use tawjihi_understanding::{OcrService, TesseractCli};
use tracing::{info, warn};

pub fn build_provider(llm: &LlmConfig) -> Result<Arc<dyn LlmProvider>> {
    let provider: Arc<dyn LlmProvider> = match llm.provider.unwrap_or(LlmProviderKind::Ollama) {
        LlmProviderKind::Openai => {
            let key = llm
                .api_key
                .clone()
                .filter(|k| !k.trim().is_empty())
                .context("OpenAI provider requires an API key (OPENAI_API_KEY)")?;
            let mut provider = OpenAiProvider::new(key);
            if let Some(url) = &llm.base_url {
                provider = provider.with_base_url(url);
            }
            Arc::new(provider)
        }
        LlmProviderKind::Ollama => {
            let mut provider = OllamaProvider::new();
            if let Some(url) = &llm.ollama_url {
                provider = provider.with_base_url(url);
            }
            Arc::new(provider)
        }
        LlmProviderKind::Mock => Arc::new(MockProvider::new("mock")),
    };
    info!(provider = %provider.name(), "LLM provider ready");
    Ok(provider)
}

pub fn generation_settings(llm: &LlmConfig) -> GenerationSettings {
    let defaults = GenerationSettings::default();
    GenerationSettings {
        model: llm.model.clone().unwrap_or(defaults.model),
        max_tokens: llm.max_tokens.unwrap_or(defaults.max_tokens),
        temperature: llm.temperature.unwrap_or(defaults.temperature),
    }
}

pub fn build_tutors(llm: &LlmConfig) -> Result<TutorRegistry> {
    Ok(TutorRegistry::new(
        build_provider(llm)?,
        generation_settings(llm),
    ))
}

/// Supabase when both URL and key are set, otherwise an in-process store.
pub fn build_memory(db: &DatabaseConfig) -> TawjihiMemory {
    let store: Arc<dyn MemoryStore> = match (&db.url, &db.key) {
        (Some(url), Some(key)) if db.is_enabled() => Arc::new(SupabaseStore::new(url, key.clone())),
        _ => {
            warn!("Database not configured; conversations are kept in memory only");
            Arc::new(InMemoryStore::new())
        }
    };
    TawjihiMemory::new(store)
}

/// Tesseract-backed OCR. A missing binary is logged, not fatal: extraction
/// then degrades to empty results.
pub async fn build_ocr(ocr: &OcrConfig) -> OcrService {
    let mut engine = TesseractCli::new(ocr.tesseract_cmd.as_deref().unwrap_or(DEFAULT_TESSERACT_CMD));
    if let (Some(oem), Some(psm)) = (ocr.oem, ocr.psm) {
        engine = engine.with_modes(oem, psm);
    }
    match engine.version().await {
        Ok(version) => info!(version = %version, "Tesseract found"),
        Err(e) => warn!(error = %e, "Tesseract unavailable; OCR will return empty results"),
    }
    OcrService::new(Arc::new(engine)).with_languages(ocr.languages.clone())
}

pub fn build_file_handler(uploads: &UploadsConfig) -> FileHandler {
    let dir = PathBuf::from(uploads.dir.as_deref().unwrap_or(DEFAULT_UPLOAD_DIR));
    let handler = FileHandler::new(dir);
    match uploads.max_file_size_mb {
        Some(mb) => handler.with_max_size_mb(mb),
        None => handler,
    }
}

pub async fn build_state(config: &TawjihiConfig) -> Result<GatewayState> {
    let llm = config.llm.clone().unwrap_or_default();
    let db = config.database.clone().unwrap_or_default();
    let ocr = config.ocr.clone().unwrap_or_default();
    let uploads = config.uploads.clone().unwrap_or_default();

    let state = GatewayState::new(
        build_tutors(&llm)?,
        build_memory(&db),
        build_ocr(&ocr).await,
        build_file_handler(&uploads),
    );
    Ok(match db.history_limit {
        Some(limit) => state.with_history_limit(limit),
        None => state,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_provider_selected() {
        let llm = LlmConfig {
            provider: Some(LlmProviderKind::Mock),
            ..Default::default()
        };
        assert_eq!(build_provider(&llm).unwrap().name(), "mock");
    }

    #[test]
    fn test_openai_requires_key() {
        let llm = LlmConfig {
            provider: Some(LlmProviderKind::Openai),
            api_key: Some(" ".into()),
            ..Default::default()
        };
        assert!(build_provider(&llm).is_err());

        let llm = LlmConfig {
            provider: Some(LlmProviderKind::Openai),
            api_key: Some("sk-test".into()),
            ..Default::default()
        };
        assert_eq!(build_provider(&llm).unwrap().name(), "openai");
    }

    #[test]
    fn test_generation_settings_from_config() {
        let llm = LlmConfig {
            model: Some("gpt-4o-mini".into()),
            temperature: Some(0.2),
            ..Default::default()
        };
        let settings = generation_settings(&llm);
        assert_eq!(settings.model, "gpt-4o-mini");
        assert_eq!(settings.max_tokens, 2048);
        assert!((settings.temperature - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn test_memory_falls_back_in_process() {
        let db = DatabaseConfig {
            url: Some("https://demo.supabase.co".into()),
            ..Default::default()
        };
        assert_eq!(build_memory(&db).backend(), "in-memory");

        let db = DatabaseConfig {
            url: Some("https://demo.supabase.co".into()),
            key: Some("anon".into()),
            ..Default::default()
        };
        assert_eq!(build_memory(&db).backend(), "supabase");
    }

    #[tokio::test]
    async fn test_build_state_with_missing_tesseract() {
        let dir = tempfile::tempdir().unwrap();
        let config = tawjihi_config::prepare(TawjihiConfig {
            llm: Some(LlmConfig {
                provider: Some(LlmProviderKind::Mock),
                ..Default::default()
            }),
            ocr: Some(OcrConfig {
                tesseract_cmd: Some("/nonexistent/tesseract".into()),
                ..Default::default()
            }),
            uploads: Some(UploadsConfig {
                dir: Some(dir.path().display().to_string()),
                max_file_size_mb: Some(4),
            }),
            ..Default::default()
        })
        .unwrap();

        let state = build_state(&config).await.unwrap();
        assert_eq!(state.files.max_file_size_mb(), 4);
        assert_eq!(state.history_limit, 50);
        assert_eq!(state.ocr.supported_languages(), ["ara", "eng"]);
    }
}
