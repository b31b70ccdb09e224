//! `tawjihi-config`: runtime configuration for the tutoring backend.
//!
//! Provides:
//! - Typed config schema (server, LLM, database, OCR, uploads, logging)
//! - YAML loading
//! - `${ENV_VAR}` substitution and well-known env overrides
//! - Default value application
//! - Validation
//! - Redaction for safe logging/display

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{
    apply_env_overrides, apply_env_overrides_with, resolve_env_vars, resolve_env_vars_with,
    MissingEnvVarError,
};
pub use io::{config_dir, config_file_path, load_raw_config};
pub use redact::redact;
pub use schema::{LlmProviderKind, TawjihiConfig};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{Context, Result};
use std::path::Path;

/// Load, substitute env vars, apply env overrides and defaults, then validate.
///
/// This is the main entry point for loading a config at runtime. Validation
/// errors are returned as an error; warnings are logged.
pub async fn load_and_prepare(path: &Path) -> Result<TawjihiConfig> {
    let raw = load_raw_config(path).await?;
    let value = resolve_env_vars(&raw).context("Failed to resolve env vars in config")?;
    let config: TawjihiConfig =
        serde_json::from_value(value).context("Failed to deserialize config")?;
    prepare(apply_env_overrides(config))
}

/// Apply defaults and validate an already-parsed config.
pub fn prepare(config: TawjihiConfig) -> Result<TawjihiConfig> {
    let config = apply_all_defaults(config);

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    if let Some(first) = report.errors.first() {
        for error in &report.errors {
            tracing::error!(path = %error.path, message = %error.message, "Config error");
        }
        anyhow::bail!(
            "{} config error(s); first: {}",
            report.errors.len(),
            first
        );
    }

    Ok(config)
}

/// Render the config as pretty JSON with secrets masked.
pub fn redacted_json(config: &TawjihiConfig) -> Result<String> {
    let value = serde_json::to_value(config).context("Failed to serialize config")?;
    Ok(serde_json::to_string_pretty(&redact(&value))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_and_prepare_reads_yaml_with_env_refs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "llm:\n  provider: mock\nserver:\n  port: 8555\n",
        )
        .unwrap();
        let cfg = load_and_prepare(&path).await.unwrap();
        assert_eq!(cfg.llm.unwrap().provider, Some(LlmProviderKind::Mock));
    }

    #[test]
    fn prepare_rejects_invalid_config() {
        let mut cfg = TawjihiConfig::default();
        cfg.uploads = Some(schema::UploadsConfig {
            max_file_size_mb: Some(0),
            ..Default::default()
        });
        assert!(prepare(cfg).is_err());
    }

    #[test]
    fn redacted_json_masks_keys() {
        let mut cfg = TawjihiConfig::default();
        cfg.llm = Some(schema::LlmConfig {
            api_key: Some("sk-secret-value".into()),
            ..Default::default()
        });
        let json = redacted_json(&cfg).unwrap();
        assert!(!json.contains("secret-value"));
    }
}
