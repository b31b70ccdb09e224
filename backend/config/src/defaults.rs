//! Config defaults: applies sensible default values to parsed config.

use crate::schema::{
    DatabaseConfig, LlmConfig, LlmProviderKind, LoggingConfig, OcrConfig, ServerConfig,
    TawjihiConfig, UploadsConfig,
};

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;

/// The tutor personas were tuned against this model.
pub const DEFAULT_MODEL: &str = "gpt-4o";
/// Local model used when no OpenAI key is configured.
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.1";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_MAX_TOKENS: u32 = 2048;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

pub const DEFAULT_TESSERACT_CMD: &str = "tesseract";
pub const DEFAULT_OCR_LANGUAGES: [&str; 2] = ["ara", "eng"];
/// LSTM engine with legacy fallback.
pub const DEFAULT_OEM: u8 = 3;
/// Assume a single uniform block of text.
pub const DEFAULT_PSM: u8 = 6;

pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 10;

pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: TawjihiConfig) -> TawjihiConfig {
    let config = apply_server_defaults(config);
    let config = apply_llm_defaults(config);
    let config = apply_database_defaults(config);
    let config = apply_ocr_defaults(config);
    let config = apply_upload_defaults(config);
    apply_logging_defaults(config)
}

fn apply_server_defaults(mut config: TawjihiConfig) -> TawjihiConfig {
    let server = config.server.get_or_insert_with(ServerConfig::default);
    server
        .bind_address
        .get_or_insert_with(|| DEFAULT_BIND_ADDRESS.to_string());
    server.port.get_or_insert(DEFAULT_PORT);
    server.cors_permissive.get_or_insert(true);
    config
}

/// Pick a provider when none is set: OpenAI with a key, otherwise Ollama.
fn apply_llm_defaults(mut config: TawjihiConfig) -> TawjihiConfig {
    let llm = config.llm.get_or_insert_with(LlmConfig::default);
    if llm.provider.is_none() {
        let has_key = llm.api_key.as_deref().is_some_and(|k| !k.is_empty());
        llm.provider = Some(if has_key {
            LlmProviderKind::Openai
        } else {
            LlmProviderKind::Ollama
        });
    }
    let provider = llm.provider.unwrap_or(LlmProviderKind::Ollama);
    llm.model
        .get_or_insert_with(|| default_model_for(provider).to_string());
    llm.base_url
        .get_or_insert_with(|| DEFAULT_OPENAI_BASE_URL.to_string());
    llm.ollama_url
        .get_or_insert_with(|| DEFAULT_OLLAMA_URL.to_string());
    llm.max_tokens.get_or_insert(DEFAULT_MAX_TOKENS);
    llm.temperature.get_or_insert(DEFAULT_TEMPERATURE);
    config
}

/// Model name the given provider can serve out of the box.
pub fn default_model_for(provider: LlmProviderKind) -> &'static str {
    match provider {
        LlmProviderKind::Ollama => DEFAULT_OLLAMA_MODEL,
        LlmProviderKind::Openai | LlmProviderKind::Mock => DEFAULT_MODEL,
    }
}

fn apply_database_defaults(mut config: TawjihiConfig) -> TawjihiConfig {
    let db = config.database.get_or_insert_with(DatabaseConfig::default);
    db.history_limit.get_or_insert(DEFAULT_HISTORY_LIMIT);
    config
}

fn apply_ocr_defaults(mut config: TawjihiConfig) -> TawjihiConfig {
    let ocr = config.ocr.get_or_insert_with(OcrConfig::default);
    ocr.tesseract_cmd
        .get_or_insert_with(|| DEFAULT_TESSERACT_CMD.to_string());
    if ocr.languages.is_empty() {
        ocr.languages = DEFAULT_OCR_LANGUAGES.iter().map(|l| l.to_string()).collect();
    }
    ocr.oem.get_or_insert(DEFAULT_OEM);
    ocr.psm.get_or_insert(DEFAULT_PSM);
    config
}

fn apply_upload_defaults(mut config: TawjihiConfig) -> TawjihiConfig {
    let uploads = config.uploads.get_or_insert_with(UploadsConfig::default);
    uploads
        .dir
        .get_or_insert_with(|| DEFAULT_UPLOAD_DIR.to_string());
    uploads.max_file_size_mb.get_or_insert(DEFAULT_MAX_FILE_SIZE_MB);
    config
}

fn apply_logging_defaults(mut config: TawjihiConfig) -> TawjihiConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    logging
        .level
        .get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());
    logging.dir.get_or_insert_with(|| DEFAULT_LOG_DIR.to_string());
    logging.json.get_or_insert(false);
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_every_section() {
        let cfg = apply_all_defaults(TawjihiConfig::default());
        assert_eq!(cfg.server.unwrap().port, Some(DEFAULT_PORT));
        assert_eq!(cfg.ocr.unwrap().languages, vec!["ara", "eng"]);
        assert_eq!(cfg.uploads.unwrap().max_file_size_mb, Some(10));
        assert_eq!(cfg.database.unwrap().history_limit, Some(50));
    }

    #[test]
    fn provider_follows_api_key() {
        let cfg = apply_all_defaults(TawjihiConfig::default());
        assert_eq!(cfg.llm.unwrap().provider, Some(LlmProviderKind::Ollama));

        let mut cfg = TawjihiConfig::default();
        cfg.llm = Some(LlmConfig {
            api_key: Some("sk-test".into()),
            ..Default::default()
        });
        let cfg = apply_all_defaults(cfg);
        assert_eq!(cfg.llm.unwrap().provider, Some(LlmProviderKind::Openai));
    }

    #[test]
    fn model_follows_provider() {
        let cfg = apply_all_defaults(TawjihiConfig::default());
        let llm = cfg.llm.unwrap();
        assert_eq!(llm.provider, Some(LlmProviderKind::Ollama));
        assert_eq!(llm.model.as_deref(), Some(DEFAULT_OLLAMA_MODEL));

        let mut cfg = TawjihiConfig::default();
        cfg.llm = Some(LlmConfig {
            api_key: Some("sk-test".into()),
            ..Default::default()
        });
        let llm = apply_all_defaults(cfg).llm.unwrap();
        assert_eq!(llm.model.as_deref(), Some(DEFAULT_MODEL));

        let mut cfg = TawjihiConfig::default();
        cfg.llm = Some(LlmConfig {
            provider: Some(LlmProviderKind::Ollama),
            model: Some("qwen2.5".into()),
            ..Default::default()
        });
        let llm = apply_all_defaults(cfg).llm.unwrap();
        assert_eq!(llm.model.as_deref(), Some("qwen2.5"));
    }

    #[test]
    fn does_not_override_user_values() {
        let mut cfg = TawjihiConfig::default();
        cfg.server = Some(ServerConfig {
            port: Some(9100),
            ..Default::default()
        });
        let cfg = apply_all_defaults(cfg);
        assert_eq!(cfg.server.unwrap().port, Some(9100));
    }
}
