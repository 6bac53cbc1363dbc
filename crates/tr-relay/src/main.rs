//! topic-relay: domain-restricted AI chat relay
//!
//! Usage:
//!   topic-relay                  - Start the HTTP server
//!   topic-relay --cli            - Start interactive CLI mode
//!   topic-relay --config <path>  - Load settings from a TOML file
//!   topic-relay --help           - Show help

mod cli;

use std::path::PathBuf;

use tr_core::{Config, DialogueController};
use tracing_subscriber::EnvFilter;

/// Run mode
#[derive(Debug, PartialEq, Eq)]
enum RunMode {
    /// HTTP server mode
    Server,
    /// Interactive CLI mode
    Cli,
    /// Show help
    Help,
    /// Show version
    Version,
}

/// Parsed command line
#[derive(Debug)]
struct Args {
    mode: RunMode,
    config_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1))?;

    match args.mode {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("topic-relay {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load(args.config_path.as_deref())
        .map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    let controller = DialogueController::from_config(&config)
        .map_err(|e| anyhow::anyhow!("Failed to initialize dialogue controller: {}", e))?;

    match args.mode {
        RunMode::Cli => {
            tracing::info!("Running in CLI mode");
            cli::run_cli(controller).await
        }
        _ => run_server(config, controller).await,
    }
}

/// Parse command line arguments
fn parse_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<Args> {
    let mut mode = RunMode::Server;
    let mut config_path = None;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--cli" | "-c" => mode = RunMode::Cli,
            "--help" | "-h" => return Ok(Args { mode: RunMode::Help, config_path }),
            "--version" | "-v" => return Ok(Args { mode: RunMode::Version, config_path }),
            "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a path"))?;
                config_path = Some(PathBuf::from(path));
            }
            other => anyhow::bail!("Unknown argument: {} (see --help)", other),
        }
    }

    Ok(Args { mode, config_path })
}

/// Print help message
fn print_help() {
    println!("topic-relay - domain-restricted AI chat relay");
    println!();
    println!("Usage:");
    println!("  topic-relay                  Start the HTTP server");
    println!("  topic-relay --cli            Start interactive CLI mode");
    println!("  topic-relay --config <path>  Load settings from a TOML file");
    println!("  topic-relay --help           Show this help message");
    println!("  topic-relay --version        Show version");
    println!();
    println!("Environment Variables:");
    println!("  GOOGLE_API_KEY         Provider API key");
    println!("  LLM_API_KEY            Provider API key (overrides GOOGLE_API_KEY)");
    println!("  LLM_PROVIDER           gemini or openai (default: gemini)");
    println!("  LLM_MODEL              Model name (default: gemini-pro)");
    println!("  LLM_BASE_URL           Custom API endpoint");
    println!("  LLM_TIMEOUT_SECS       Provider request timeout (default: 120)");
    println!("  RELAY_DOMAIN           Topic domain (default: Python programming help)");
    println!("  RELAY_HOST             Listen host (default: 127.0.0.1)");
    println!("  RELAY_PORT             Listen port (default: 5000)");
    println!("  RELAY_ALLOWED_ORIGINS  Comma-separated CORS origins");
    println!("  SESSION_BACKEND        memory or sqlite (default: memory)");
    println!("  SESSION_DB_PATH        SQLite path (default: data/topic-relay.db)");
    println!("  SESSION_COOKIE_NAME    Session cookie name (default: topic_relay_session)");
}

/// Run the HTTP server until Ctrl+C
async fn run_server(config: Config, controller: DialogueController) -> anyhow::Result<()> {
    tracing::info!("{}", "=".repeat(60));
    tracing::info!("AI chat server - domain: {}", config.domain.label);
    tracing::info!("{}", "=".repeat(60));
    tracing::info!("Provider: {} (model {})", config.llm.provider.as_str(), config.llm.model());
    tracing::info!("Open http://{}:{} in your browser", config.server.host, config.server.port);

    let state = tr_api::AppState::new(config, controller);

    let handle = tokio::spawn(async move {
        if let Err(e) = tr_api::start_server(state).await {
            tracing::error!("HTTP server error: {}", e);
        }
    });

    let server = handle.abort_handle();

    tracing::info!("Press Ctrl+C to exit");

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("Shutting down...");
            server.abort();
        }
        result = handle => {
            result?;
            anyhow::bail!("HTTP server stopped unexpectedly");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
