//! Tournament Registration Bot
//!
//! Serves the Discord interactions endpoint and keeps the registration
//! prompt alive in the configured channel.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tourney_signup::{
    AppContext, BotConfig, ChannelId, DiscordClient, InteractionRouter, ServerState,
    SignatureVerifier, SqliteSubmissionStore,
};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "tourney-signup")]
#[command(about = "Tournament registration bot for Discord")]
struct Args {
    /// TOML config file
    #[arg(short, long, env = "REGISTRAR_CONFIG")]
    config: Option<PathBuf>,

    /// Bot token
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Hex-encoded application public key
    #[arg(long, env = "DISCORD_PUBLIC_KEY")]
    public_key: Option<String>,

    /// Channel that hosts the registration prompt
    #[arg(long, env = "REGISTRATION_CHANNEL_ID")]
    channel: Option<ChannelId>,

    /// SQLite database file
    #[arg(short, long, env = "REGISTRATION_DB")]
    database: Option<PathBuf>,

    /// Server host
    #[arg(long, env = "REGISTRAR_HOST")]
    host: Option<String>,

    /// Server port
    #[arg(short, long, env = "REGISTRAR_PORT")]
    port: Option<u16>,
}

impl Args {
    fn into_config(self) -> Result<BotConfig> {
        let mut config = match &self.config {
            Some(path) => BotConfig::from_file(path)?,
            None => BotConfig::default(),
        };

        if let Some(token) = self.token {
            config.discord.bot_token = Some(token);
        }
        if let Some(key) = self.public_key {
            config.discord.public_key = Some(key);
        }
        if let Some(channel) = self.channel {
            config.registration.channel_id = Some(channel);
        }
        if let Some(database) = self.database {
            config.database_path = database;
        }
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tourney_signup=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .init();

    let config = Args::parse().into_config()?;

    info!("Starting tournament registration bot");
    info!("  Database: {:?}", config.database_path);
    info!("  Verified role: {}", config.registration.verified_role);
    if config.registration.tournaments.is_empty() {
        warn!("  No open tournaments configured; registration is disabled");
    } else {
        info!("  Open tournaments: {}", config.registration.tournaments.join(", "));
    }

    let store = SqliteSubmissionStore::open(&config.database_path)
        .context("Failed to open registration store")?;

    // validate() guarantees both are present
    let token = config.discord.bot_token.clone().unwrap_or_default();
    let public_key = config.discord.public_key.clone().unwrap_or_default();
    let transport = DiscordClient::new(&config.discord.api_base_url, &token);
    let verifier = SignatureVerifier::from_hex(&public_key)?;

    let server_config = config.server.clone();
    let ctx = Arc::new(AppContext::new(config, Arc::new(store), Arc::new(transport)));

    // Handlers are routed by custom id, so the endpoint serves button presses
    // even when the prompt step fails.
    if let Err(e) = ctx.start_prompt().await {
        warn!("Serving interactions without a confirmed prompt: {}", e);
    }

    let state = Arc::new(ServerState {
        router: InteractionRouter::new(ctx),
        verifier,
    });

    tourney_signup::server::run_server(&server_config, state).await
}
