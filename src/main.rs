//! Gotify NATS bridge - Main Entry Point
//!
//! Runs one bridge instance outside of a Gotify server, posting notifications
//! through Gotify's REST API.

use clap::{Parser, Subcommand};
use gotify_nats_bridge::observability::{init_default_logging, LogLevelHandle};
use gotify_nats_bridge::sink::{GotifySink, GotifySinkConfig, LogSink, MessageSink};
use gotify_nats_bridge::{plugin_info, BridgeConfig, NatsBridge, NatsTransport, Plugin, UserContext};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

/// Forward messages from a NATS subject to Gotify
#[derive(Parser)]
#[command(name = "gotify-nats-bridge")]
#[command(about = "Forward messages from a NATS subject to Gotify")]
#[command(version)]
struct Cli {
    /// Configuration file path (YAML, JSON or TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bridge until SIGINT or SIGTERM
    Run {
        /// Gotify server base URL
        #[arg(long, env = "GOTIFY_URL", default_value = "http://localhost:80")]
        gotify_url: String,

        /// Gotify application token
        #[arg(long, env = "GOTIFY_TOKEN", hide_env_values = true)]
        gotify_token: Option<String>,

        /// Log notifications instead of sending them to Gotify
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate the configuration
    Config {
        /// Show the effective configuration
        #[arg(long)]
        show: bool,
    },
    /// Print the default configuration
    DefaultConfig,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match init_default_logging() {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(1);
        }
    };

    let info = plugin_info();
    info!("Starting {} v{}", info.name, info.version);

    let result = match cli.command {
        Commands::DefaultConfig => print_default_config(),
        Commands::Config { show } => match load_configuration(cli.config.as_deref()) {
            Ok(config) => handle_config_command(config, show),
            Err(e) => Err(e),
        },
        Commands::Run {
            gotify_url,
            gotify_token,
            dry_run,
        } => match load_configuration(cli.config.as_deref()) {
            Ok(config) => {
                run_bridge(config, log_level, gotify_url, gotify_token, dry_run).await
            }
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }

    info!("Application shutdown complete");
}

fn load_configuration(config_path: Option<&Path>) -> Result<BridgeConfig, Box<dyn std::error::Error>> {
    if let Some(path) = config_path {
        info!("Loading configuration from: {}", path.display());
        return Ok(BridgeConfig::load_from_file(path)?);
    }

    // Try default locations
    let default_paths = ["bridge.yaml", "bridge.yml", "config/bridge.yaml", "bridge.toml"];
    for path_str in default_paths {
        let path = PathBuf::from(path_str);
        if path.exists() {
            info!("Loading configuration from: {}", path.display());
            return Ok(BridgeConfig::load_from_file(&path)?);
        }
    }

    warn!("No configuration file found, using defaults");
    Ok(BridgeConfig::default())
}

fn build_sink(
    gotify_url: String,
    gotify_token: Option<String>,
    dry_run: bool,
) -> Result<Arc<dyn MessageSink>, Box<dyn std::error::Error>> {
    if dry_run {
        info!("Dry run: notifications are logged, not sent");
        return Ok(Arc::new(LogSink));
    }

    let sink = GotifySink::new(GotifySinkConfig {
        base_url: gotify_url,
        app_token: gotify_token.unwrap_or_default(),
        ..Default::default()
    })?;
    info!(endpoint = %sink.endpoint(), "Sending notifications to Gotify");
    Ok(Arc::new(sink))
}

async fn run_bridge(
    config: BridgeConfig,
    log_level: LogLevelHandle,
    gotify_url: String,
    gotify_token: Option<String>,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let sink = build_sink(gotify_url, gotify_token, dry_run)?;

    let user = UserContext::new(1, whoami());
    let mut bridge =
        NatsBridge::new(user, Arc::new(NatsTransport::new())).with_log_level_handle(log_level);
    bridge.set_message_sink(sink);
    bridge.validate_and_set_config(config)?;
    bridge.enable().await?;

    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())?;
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;

    info!("Bridge is running and waiting for messages on NATS...");

    tokio::select! {
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down gracefully...");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }

    bridge.disable().await?;
    Ok(())
}

fn handle_config_command(config: BridgeConfig, show: bool) -> Result<(), Box<dyn std::error::Error>> {
    if show {
        println!("{}", serde_yaml::to_string(&config)?);
    }

    info!(auth = %config.auth_strategy(), "Configuration validation complete");
    Ok(())
}

fn print_default_config() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_yaml::to_string(&BridgeConfig::default())?);
    Ok(())
}

fn whoami() -> String {
    std::env::var("USER").unwrap_or_else(|_| "gotify".to_string())
}
