//! Tawjihi runtime configuration schema.
//!
//! Typed for serde YAML/JSON deserialization. Every field is optional on
//! disk; `defaults::apply_all_defaults` fills in what the runtime needs.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration for the tutoring backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TawjihiConfig {
    /// HTTP/WebSocket server settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,

    /// LLM provider backing the tutor personas
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmConfig>,

    /// Hosted database (Supabase/PostgREST) used for conversation memory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<DatabaseConfig>,

    /// OCR engine settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr: Option<OcrConfig>,

    /// Homework upload storage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploads: Option<UploadsConfig>,

    /// Logging configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Allow any origin (the web form is often served from elsewhere in dev)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cors_permissive: Option<bool>,
}

// ---------------------------------------------------------------------------
// LLM
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProviderKind {
    /// OpenAI-compatible `/chat/completions` endpoint
    Openai,
    /// Local Ollama server
    Ollama,
    /// Canned responses, for offline development
    Mock,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<LlmProviderKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ollama_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

// ---------------------------------------------------------------------------
// Database
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Service or anon key, sent as `apikey` and bearer token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Rows returned by `get_conversation_history` when no limit is given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_limit: Option<usize>,
}

impl DatabaseConfig {
    /// Memory is persisted only when both URL and key are present.
    pub fn is_enabled(&self) -> bool {
        let set = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        set(&self.url) && set(&self.key)
    }
}

// ---------------------------------------------------------------------------
// OCR
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrConfig {
    /// Path or name of the tesseract binary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tesseract_cmd: Option<String>,
    /// Tesseract language codes to compare (e.g. `ara`, `eng`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,
    /// OCR engine mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oem: Option<u8>,
    /// Page segmentation mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub psm: Option<u8>,
}

// ---------------------------------------------------------------------------
// Uploads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_file_size_mb: Option<u64>,
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
    /// Emit JSON on the console as well as in the log file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,
}
