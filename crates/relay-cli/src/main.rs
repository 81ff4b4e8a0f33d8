use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use relay_core::{ProviderHandles, ProviderKind, mask_secret};
use relay_gateway::RelayServer;
use std::net::IpAddr;
use std::path::PathBuf;
use tokio::signal;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::RelayConfig;

#[derive(Parser)]
#[command(name = "duorelay")]
#[command(version)]
#[command(about = "duorelay — one chat endpoint for OpenAI and Anthropic")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Load secrets from this file instead of ./.env
    #[arg(long, global = true, env = "DUORELAY_ENV_FILE")]
    env_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay server
    Start {
        /// Address to bind (default 127.0.0.1)
        #[arg(long)]
        bind: Option<IpAddr>,

        /// Port to listen on (default 8000)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Before logging, so RUST_LOG may come from .env too
    let env_file = load_env_file(&cli.env_file);

    // Set up logging
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.debug))
        .init();

    env_file?.log();

    match cli.command {
        Commands::Start { bind, port } => cmd_start(&cli.config, bind, port).await,
        Commands::Config => cmd_config(&cli.config).await,
    }
}

fn log_filter(debug: bool) -> EnvFilter {
    let filter = if debug { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter))
}

/// What happened to `.env`, reported once logging is up
#[derive(Debug)]
enum EnvFile {
    Loaded(PathBuf),
    NotFound,
    Unreadable(dotenvy::Error),
}

impl EnvFile {
    fn log(&self) {
        match self {
            Self::Loaded(path) => info!("Loaded environment from {}", path.display()),
            Self::NotFound => debug!("No .env file found in the working directory"),
            Self::Unreadable(e) => warn!("Failed to load .env file: {}", e),
        }
    }
}

/// Load `.env` into the process environment. Variables that are already set
/// win. A missing default `.env` is fine; a missing explicit file is not.
fn load_env_file(path: &Option<PathBuf>) -> Result<EnvFile> {
    match path {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("Failed to load env file {}", path.display()))?;
            Ok(EnvFile::Loaded(path.clone()))
        }
        None => Ok(match dotenvy::dotenv() {
            Ok(path) => EnvFile::Loaded(path),
            Err(e) if e.not_found() => EnvFile::NotFound,
            Err(e) => EnvFile::Unreadable(e),
        }),
    }
}

async fn cmd_config(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = RelayConfig::load(config_path)?;
    println!("{}", toml::to_string_pretty(&cfg)?);

    for kind in ProviderKind::ALL {
        let key = std::env::var(kind.env_var()).unwrap_or_default();
        println!("# {} = {}", kind.env_var(), mask_secret(key.trim()));
    }
    Ok(())
}

async fn cmd_start(
    config_path: &Option<PathBuf>,
    bind: Option<IpAddr>,
    port: Option<u16>,
) -> Result<()> {
    let cfg = RelayConfig::load(config_path)?;
    info!("Starting duorelay...");

    let settings = cfg.provider_settings().with_keys_from_env();
    let providers = ProviderHandles::initialize(&settings);

    let addr = cfg.listen_addr(bind, port);
    RelayServer::new(addr, providers)
        .run(shutdown_signal())
        .await
        .with_context(|| format!("Relay server on {} failed", addr))
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!("Failed to listen for Ctrl+C ({}); running until killed", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::io::Write;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_start_overrides() {
        let cli = Cli::parse_from(["duorelay", "--debug", "start", "--bind", "0.0.0.0", "-p", "9000"]);
        assert!(cli.debug);
        match cli.command {
            Commands::Start { bind, port } => {
                assert_eq!(bind, Some("0.0.0.0".parse().unwrap()));
                assert_eq!(port, Some(9000));
            }
            Commands::Config => panic!("expected start"),
        }
    }

    #[test]
    fn test_missing_explicit_env_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_env_file(&Some(dir.path().join("missing.env"))).unwrap_err();
        assert!(err.to_string().contains("Failed to load env file"));
    }

    #[test]
    fn test_env_file_can_set_log_filter() {
        let preset = std::env::var("RUST_LOG").is_ok();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "RUST_LOG=relay_gateway=trace").unwrap();

        let loaded = load_env_file(&Some(file.path().to_path_buf())).unwrap();
        assert!(matches!(loaded, EnvFile::Loaded(ref p) if p == file.path()));
        if !preset {
            assert_eq!(log_filter(false).to_string(), "relay_gateway=trace");
        }
    }
}
