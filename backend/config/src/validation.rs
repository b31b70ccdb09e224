//! Config validation: schema checks with user-friendly error messages.

use crate::schema::{LlmProviderKind, TawjihiConfig};
use thiserror::Error;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &TawjihiConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_server(config, &mut report);
    validate_llm(config, &mut report);
    validate_database(config, &mut report);
    validate_ocr(config, &mut report);
    validate_uploads(config, &mut report);
    report
}

fn validate_server(config: &TawjihiConfig, report: &mut ValidationReport) {
    let Some(server) = &config.server else { return };
    if let Some(port) = server.port {
        if port == 0 {
            report.error("server.port", "Port must be > 0");
        } else if port < 1024 && port != 80 && port != 443 {
            report.warn(
                "server.port",
                format!("Port {port} requires elevated privileges; consider using a port >= 1024"),
            );
        }
    }
}

fn validate_llm(config: &TawjihiConfig, report: &mut ValidationReport) {
    let Some(llm) = &config.llm else { return };
    if llm.provider == Some(LlmProviderKind::Openai)
        && llm.api_key.as_deref().map(str::is_empty).unwrap_or(true)
    {
        report.error("llm.apiKey", "OpenAI provider requires an API key (OPENAI_API_KEY)");
    }
    if llm.provider == Some(LlmProviderKind::Mock) {
        report.warn("llm.provider", "Mock provider returns canned answers");
    }
    if let Some(t) = llm.temperature {
        if !(0.0..=2.0).contains(&t) {
            report.error("llm.temperature", "Temperature must be between 0.0 and 2.0");
        }
    }
    if llm.max_tokens == Some(0) {
        report.error("llm.maxTokens", "maxTokens must be >= 1");
    }
}

fn validate_database(config: &TawjihiConfig, report: &mut ValidationReport) {
    let Some(db) = &config.database else { return };
    if !db.is_enabled() {
        if db.url.is_some() || db.key.is_some() {
            report.warn(
                "database",
                "Only one of url/key is set; conversation memory stays in-process",
            );
        } else {
            report.warn("database", "No database configured; conversation memory stays in-process");
        }
        return;
    }
    if let Some(url) = &db.url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            report.error("database.url", "Database URL must start with http:// or https://");
        }
    }
}

fn validate_ocr(config: &TawjihiConfig, report: &mut ValidationReport) {
    let Some(ocr) = &config.ocr else { return };
    if ocr.languages.len() == 1 {
        report.error(
            "ocr.languages",
            "List two languages: extraction compares a pair and the second wins ties",
        );
    }
    for (i, lang) in ocr.languages.iter().enumerate() {
        if lang.len() != 3 || !lang.chars().all(|c| c.is_ascii_lowercase()) {
            report.error(
                format!("ocr.languages[{i}]"),
                format!("'{lang}' is not a tesseract language code (e.g. 'ara', 'eng')"),
            );
        }
    }
    if let Some(psm) = ocr.psm {
        if psm > 13 {
            report.error("ocr.psm", "Page segmentation mode must be 0-13");
        }
    }
    if let Some(oem) = ocr.oem {
        if oem > 3 {
            report.error("ocr.oem", "OCR engine mode must be 0-3");
        }
    }
}

fn validate_uploads(config: &TawjihiConfig, report: &mut ValidationReport) {
    let Some(uploads) = &config.uploads else { return };
    if uploads.max_file_size_mb == Some(0) {
        report.error("uploads.maxFileSizeMb", "maxFileSizeMb must be >= 1");
    }
    if uploads.dir.as_deref().is_some_and(|d| d.trim().is_empty()) {
        report.error("uploads.dir", "Upload directory cannot be empty");
    }
}
