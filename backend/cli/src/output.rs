//! Terminal notes and report formatting.

use serde_json::Value;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";

/// Color unless `NO_COLOR` is set or the terminal is dumb.
pub fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && std::env::var("TERM").map(|t| t != "dumb").unwrap_or(false)
}

pub fn note_success(msg: &str) {
    if supports_color() {
        println!("{GREEN}{BOLD}✓{RESET} {msg}");
    } else {
        println!("OK: {msg}");
    }
}

pub fn note_warn(msg: &str) {
    if supports_color() {
        println!("{YELLOW}{BOLD}⚠{RESET} {msg}");
    } else {
        println!("WARN: {msg}");
    }
}

pub fn note_error(msg: &str) {
    if supports_color() {
        eprintln!("{RED}{BOLD}✗{RESET} {msg}");
    } else {
        eprintln!("ERROR: {msg}");
    }
}

/// `key: value` lines for a flat JSON object, keys aligned.
pub fn render_fields(value: &Value) -> String {
    let Some(map) = value.as_object() else {
        return value.to_string();
    };
    let width = map.keys().map(|k| k.chars().count()).max().unwrap_or(0);
    map.iter()
        .map(|(k, v)| {
            let shown = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("  {k:<width$}  {shown}\n")
        })
        .collect()
}
