//! Structured Logger
//!
//! Wraps `tracing` to provide console output, a daily rolling NDJSON file,
//! and environment-based level control.

use std::path::Path;
use tracing::Subscriber;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global structured logger.
///
/// `RUST_LOG` takes precedence over `level`. With `json_console` the console
/// layer also emits JSON, which is what container deployments want.
/// Calling this twice is harmless: the second registry is discarded.
pub fn init_logger<P: AsRef<Path>>(log_dir: P, level: &str, json_console: bool) {
    let _ = build_subscriber(log_dir, level, json_console).try_init();
}

fn build_subscriber<P: AsRef<Path>>(
    log_dir: P,
    level: &str,
    json_console: bool,
) -> impl Subscriber + Send + Sync + 'static {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    // Writes NDJSON to `<log_dir>/tawjihi.log.YYYY-MM-DD`
    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "tawjihi.log");

    let file_layer = fmt::layer()
        .json()
        .with_writer(file_appender)
        .with_ansi(false);

    // Exactly one console layer is present.
    let json_layer = json_console.then(|| fmt::layer().json().with_writer(std::io::stdout));
    let text_layer = (!json_console).then(|| {
        fmt::layer()
            .with_writer(std::io::stdout)
            .with_target(false)
            .with_ansi(true)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(file_layer)
}
