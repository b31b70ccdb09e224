//! Environment variable handling for config values.
//!
//! Two mechanisms:
//! - `${VAR_NAME}` references inside YAML string values, resolved at load time
//!   (`$${VAR}` escapes to a literal `${VAR}`).
//! - Well-known variables (`OPENAI_API_KEY`, `SUPABASE_URL`, ...) that override
//!   the file, so a bare `.env` deployment needs no YAML at all.

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

use crate::schema::{
    DatabaseConfig, LlmConfig, LoggingConfig, OcrConfig, ServerConfig, TawjihiConfig,
    UploadsConfig,
};

/// Matches `${VAR}` and the escaped `$${VAR}` form.
static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$?\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

/// Error returned for missing env vars.
#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute `${VAR}` references in a config JSON value tree using the process env.
pub fn resolve_env_vars(value: &Value) -> Result<Value> {
    substitute_value(value, &std::env::vars().collect(), "")
}

/// Substitute env vars using a provided map (useful for testing).
pub fn resolve_env_vars_with(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    substitute_value(value, env, "")
}

fn substitute_value(value: &Value, env: &HashMap<String, String>, path: &str) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(substitute_string(s, env, path)?)),
        Value::Array(arr) => {
            let result: Result<Vec<_>> = arr
                .iter()
                .enumerate()
                .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
                .collect();
            Ok(Value::Array(result?))
        }
        Value::Object(map) => {
            let mut result = serde_json::Map::new();
            for (k, v) in map {
                let child_path = if path.is_empty() {
                    k.clone()
                } else {
                    format!("{path}.{k}")
                };
                result.insert(k.clone(), substitute_value(v, env, &child_path)?);
            }
            Ok(Value::Object(result))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_string(s: &str, env: &HashMap<String, String>, path: &str) -> Result<String> {
    if !s.contains('$') {
        return Ok(s.to_string());
    }

    let mut missing: Option<MissingEnvVarError> = None;
    let substituted = ENV_VAR_PATTERN.replace_all(s, |caps: &regex::Captures| {
        let whole = &caps[0];
        let var_name = &caps[1];
        if whole.starts_with("$$") {
            return format!("${{{var_name}}}");
        }
        match env.get(var_name) {
            Some(val) if !val.is_empty() => val.clone(),
            _ => {
                missing.get_or_insert_with(|| MissingEnvVarError {
                    var_name: var_name.to_string(),
                    config_path: path.to_string(),
                });
                String::new()
            }
        }
    });

    if let Some(err) = missing {
        bail!(err);
    }
    Ok(substituted.into_owned())
}

/// Apply well-known environment overrides using the process env.
pub fn apply_env_overrides(config: TawjihiConfig) -> TawjihiConfig {
    apply_env_overrides_with(config, |name| std::env::var(name).ok())
}

/// Apply well-known environment overrides using a lookup function.
///
/// Empty values are treated as unset.
pub fn apply_env_overrides_with<F>(mut config: TawjihiConfig, lookup: F) -> TawjihiConfig
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    let server = config.server.get_or_insert_with(ServerConfig::default);
    if let Some(bind) = get("TAWJIHI_BIND") {
        server.bind_address = Some(bind);
    }
    if let Some(port) = get("TAWJIHI_PORT")
        .or_else(|| get("PORT"))
        .and_then(|p| p.parse().ok())
    {
        server.port = Some(port);
    }

    let llm = config.llm.get_or_insert_with(LlmConfig::default);
    if let Some(key) = get("OPENAI_API_KEY") {
        llm.api_key = Some(key);
    }
    if let Some(url) = get("OPENAI_BASE_URL") {
        llm.base_url = Some(url);
    }
    if let Some(model) = get("TAWJIHI_MODEL") {
        llm.model = Some(model);
    }
    if let Some(url) = get("OLLAMA_URL") {
        llm.ollama_url = Some(url);
    }

    let db = config.database.get_or_insert_with(DatabaseConfig::default);
    if let Some(url) = get("SUPABASE_URL") {
        db.url = Some(url);
    }
    if let Some(key) = get("SUPABASE_KEY") {
        db.key = Some(key);
    }

    if let Some(cmd) = get("TESSERACT_CMD") {
        config.ocr.get_or_insert_with(OcrConfig::default).tesseract_cmd = Some(cmd);
    }
    if let Some(dir) = get("TAWJIHI_UPLOAD_DIR") {
        config.uploads.get_or_insert_with(UploadsConfig::default).dir = Some(dir);
    }
    if let Some(level) = get("RUST_LOG") {
        config.logging.get_or_insert_with(LoggingConfig::default).level = Some(level);
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn substitutes_simple_var() {
        let v = json!({"llm": {"apiKey": "${OPENAI_API_KEY}"}});
        let env = env(&[("OPENAI_API_KEY", "sk-abc123")]);
        let result = resolve_env_vars_with(&v, &env).unwrap();
        assert_eq!(result["llm"]["apiKey"], "sk-abc123");
    }

    #[test]
    fn error_on_missing_var() {
        let v = json!({"database": {"key": "${SUPABASE_KEY}"}});
        let err = resolve_env_vars_with(&v, &HashMap::new()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("SUPABASE_KEY"));
        assert!(msg.contains("database.key"));
    }

    #[test]
    fn escaped_reference_is_kept_literal() {
        let v = json!({"note": "use $${HOME} literally"});
        let result = resolve_env_vars_with(&v, &HashMap::new()).unwrap();
        assert_eq!(result["note"], "use ${HOME} literally");
    }

    #[test]
    fn overrides_from_well_known_vars() {
        let vars = env(&[
            ("PORT", "9001"),
            ("SUPABASE_URL", "https://demo.supabase.co"),
            ("SUPABASE_KEY", "anon"),
            ("OPENAI_API_KEY", ""),
        ]);
        let cfg = apply_env_overrides_with(TawjihiConfig::default(), |k| vars.get(k).cloned());
        assert_eq!(cfg.server.unwrap().port, Some(9001));
        assert!(cfg.database.unwrap().is_enabled());
        assert!(cfg.llm.unwrap().api_key.is_none());
    }

    #[test]
    fn tawjihi_port_wins_over_port() {
        let vars = env(&[("PORT", "9001"), ("TAWJIHI_PORT", "9002")]);
        let cfg = apply_env_overrides_with(TawjihiConfig::default(), |k| vars.get(k).cloned());
        assert_eq!(cfg.server.unwrap().port, Some(9002));
    }
}
