mod output;
mod repl;
mod runtime;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tawjihi_config::defaults::{
    DEFAULT_BIND_ADDRESS, DEFAULT_LOG_DIR, DEFAULT_LOG_LEVEL, DEFAULT_PORT,
};
use tawjihi_config::{config_dir, config_file_path, load_and_prepare, redacted_json, TawjihiConfig};
use tracing::info;

#[derive(Parser)]
#[command(name = "tawjihi")]
#[command(about = "TawjihiAI: tutoring backend for Jordanian Tawjihi students")]
#[command(version)]
struct Cli {
    /// Config file (defaults to `$TAWJIHI_CONFIG_DIR/config.yaml` or `~/.tawjihi/config.yaml`)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP and WebSocket server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Ask the tutors interactively in the terminal
    Ask,
    /// Query the health endpoint of a running server
    Status {
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Print the effective config with secrets masked
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| config_file_path(&config_dir()));
    let config = load_and_prepare(&path)
        .await
        .with_context(|| format!("Failed to load config from {}", path.display()))?;

    match cli.command {
        Commands::Serve { port } => {
            init_logging(&config, None);
            serve(config, port).await
        }
        Commands::Ask => {
            // Keep the console quiet while the REPL owns it.
            init_logging(&config, Some("warn"));
            ask(config).await
        }
        Commands::Status { port } => status(&config, port).await,
        Commands::Config => {
            println!("{}", redacted_json(&config)?);
            Ok(())
        }
    }
}

fn init_logging(config: &TawjihiConfig, level_override: Option<&str>) {
    let logging = config.logging.clone().unwrap_or_default();
    let level = level_override
        .or(logging.level.as_deref())
        .unwrap_or(DEFAULT_LOG_LEVEL);
    tawjihi_logging::init_logger(
        logging.dir.as_deref().unwrap_or(DEFAULT_LOG_DIR),
        level,
        logging.json.unwrap_or(false),
    );
}

fn server_port(config: &TawjihiConfig, port: Option<u16>) -> u16 {
    port.or_else(|| config.server.as_ref().and_then(|s| s.port))
        .unwrap_or(DEFAULT_PORT)
}

async fn serve(config: TawjihiConfig, port: Option<u16>) -> Result<()> {
    let server = config.server.clone().unwrap_or_default();
    let bind = server.bind_address.as_deref().unwrap_or(DEFAULT_BIND_ADDRESS);
    let port = server_port(&config, port);
    let addr: SocketAddr = format!("{bind}:{port}")
        .parse()
        .with_context(|| format!("Invalid bind address {bind}:{port}"))?;

    info!(addr = %addr, "Starting TawjihiAI server");
    let state = runtime::build_state(&config).await?;
    info!(memory = %state.memory.backend(), "Components ready");

    tawjihi_gateway::start_server(addr, state, server.cors_permissive.unwrap_or(true)).await
}

async fn ask(config: TawjihiConfig) -> Result<()> {
    let llm = config.llm.clone().unwrap_or_default();
    let tutors = runtime::build_tutors(&llm)?;
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    repl::run(&tutors, stdin, &mut stdout).await
}

async fn status(config: &TawjihiConfig, port: Option<u16>) -> Result<()> {
    let port = server_port(config, port);
    let url = format!("http://localhost:{port}/health");

    match reqwest::get(&url).await {
        Ok(resp) if resp.status().is_success() => {
            let body: serde_json::Value = resp.json().await?;
            output::note_success(&format!("TawjihiAI is running on port {port}"));
            print!("{}", output::render_fields(&body));
        }
        Ok(resp) => {
            output::note_warn(&format!("Server on port {port} answered {}", resp.status()));
        }
        Err(e) => {
            output::note_error(&format!("TawjihiAI is not running on port {port}: {e}"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tawjihi_config::schema::ServerConfig;

    #[test]
    fn test_port_flag_wins_over_config() {
        let config = TawjihiConfig {
            server: Some(ServerConfig {
                port: Some(9100),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(server_port(&config, Some(9200)), 9200);
        assert_eq!(server_port(&config, None), 9100);
        assert_eq!(server_port(&TawjihiConfig::default(), None), 8000);
    }

    #[test]
    fn test_cli_parses_serve_port() {
        let cli = Cli::try_parse_from(["tawjihi", "serve", "--port", "8080"]).unwrap();
        assert!(matches!(cli.command, Commands::Serve { port: Some(8080) }));
    }
}
