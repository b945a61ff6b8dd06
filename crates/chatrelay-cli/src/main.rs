use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chatrelay_core::{
    ChatProvider, ChatRelay, ConversationTurn, FAILURE_MESSAGE, GeminiProvider,
    OpenRouterProvider,
};
use chatrelay_gateway::GatewayServer;

mod config;

use config::RelayConfig;

#[derive(Parser)]
#[command(name = "chatrelay")]
#[command(version)]
#[command(about = "Chat relay with Gemini primary and OpenRouter fallback")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP relay
    Serve {
        /// Override the configured bind address
        #[arg(long)]
        bind: Option<String>,

        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Send a one-shot message through the relay
    Ask {
        /// The message to send
        message: String,
    },

    /// Write the default config file
    Init,

    /// Show current configuration (secrets masked)
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --debug
    let default_filter = if cli.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Init => cmd_init().await,
        Commands::Config => cmd_config(&cli.config).await,
        Commands::Serve { bind, port } => cmd_serve(&cli.config, bind, port).await,
        Commands::Ask { message } => cmd_ask(&cli.config, &message).await,
    }
}

async fn cmd_init() -> Result<()> {
    let config_dir = config::config_dir();
    tokio::fs::create_dir_all(&config_dir)
        .await
        .with_context(|| format!("Failed to create config dir: {}", config_dir.display()))?;

    let config_path = config::default_config_path();
    if config_path.exists() {
        warn!("Config already exists at {}", config_path.display());
        return Ok(());
    }

    tokio::fs::write(&config_path, config::DEFAULT_CONFIG).await?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(&config_path, std::fs::Permissions::from_mode(0o600)).await?;
    }
    info!("Created default config at {}", config_path.display());

    println!("chatrelay initialized at {}", config_dir.display());
    println!(
        "Set GEMINI_API_KEY and/or OPENROUTER_API_KEY, or edit {}.",
        config_path.display()
    );
    Ok(())
}

async fn cmd_config(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = RelayConfig::load(config_path)?;
    println!("{}", toml::to_string_pretty(&cfg.masked())?);
    Ok(())
}

async fn cmd_serve(
    config_path: &Option<PathBuf>,
    bind: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    let mut cfg = RelayConfig::load(config_path)?;
    if let Some(bind) = bind {
        cfg.server.bind = bind;
    }
    if let Some(port) = port {
        cfg.server.port = port;
    }

    let relay = Arc::new(build_relay(&cfg)?);
    let addr = cfg.socket_addr()?;

    GatewayServer::new(addr, relay)
        .with_chat_path(cfg.server.path.clone())
        .with_cors(cfg.server.cors)
        .with_max_body_bytes(cfg.server.max_body_bytes)
        .run(shutdown_signal())
        .await
}

async fn cmd_ask(config_path: &Option<PathBuf>, message: &str) -> Result<()> {
    let cfg = RelayConfig::load(config_path)?;
    let relay = build_relay(&cfg)?;

    match relay.relay(&[ConversationTurn::user(message)]).await {
        Ok(reply) => {
            println!("{}", reply);
            Ok(())
        }
        Err(e) => {
            warn!(kind = e.kind(), "Relay failed: {}", e);
            bail!(FAILURE_MESSAGE)
        }
    }
}

/// Wire the two tiers in fixed order: Gemini, then OpenRouter
fn build_relay(cfg: &RelayConfig) -> Result<ChatRelay> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(cfg.http.timeout_secs))
        .build()
        .context("Failed to build HTTP client")?;

    let gemini = &cfg.providers.gemini;
    let openrouter = &cfg.providers.openrouter;
    let providers: Vec<Box<dyn ChatProvider>> = vec![
        Box::new(GeminiProvider::new(
            client.clone(),
            Some(gemini.api_key.clone()),
            gemini.model.clone(),
            gemini.base_url.clone(),
        )),
        Box::new(OpenRouterProvider::new(
            client,
            Some(openrouter.api_key.clone()),
            openrouter.model.clone(),
            openrouter.base_url.clone(),
        )),
    ];

    for provider in &providers {
        if provider.is_configured() {
            info!(
                "Provider {} ready (model: {})",
                provider.provider_name(),
                provider.model()
            );
        } else {
            warn!(
                "Provider {} has no API key, it will be skipped",
                provider.provider_name()
            );
        }
    }
    if !providers.iter().any(|p| p.is_configured()) {
        warn!("No provider keys configured; every request will fail");
    }

    Ok(ChatRelay::new(providers))
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, shutting down...");
}
