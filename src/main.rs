use anyhow::{Context as _, Result};
use clap::Parser;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

/// Reaction-based member verification bot with a web admin API
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path of the persisted verification configuration
    #[arg(long, env = "CONFIG_PATH", default_value = "config.json")]
    config: PathBuf,

    /// Port of the admin API (binds 0.0.0.0)
    #[arg(long, env = "PORT", default_value_t = 5000)]
    port: u16,

    /// Public URL of the admin panel, shown by /panel and /info
    #[arg(long, env = "WEB_URL", default_value = "http://localhost:5000")]
    web_url: String,

    /// Seconds the admin API waits for the gateway to publish
    #[arg(long, env = "PUBLISH_TIMEOUT_SECS", default_value_t = bridge::DEFAULT_TIMEOUT.as_secs())]
    publish_timeout_secs: u64,

    /// Register slash commands in this guild only (faster for testing)
    #[arg(long, env = "COMMAND_GUILD_ID")]
    guild_id: Option<u64>,
}

mod audit;
mod bridge;
mod commands;
mod config;
mod error;
mod events;
mod gateway;
mod logging;
mod messages;
mod platform;
mod publish;
mod web;

use gateway::{EventSender, GatewaySettings};
use platform::SharedPlatform;

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

/// Shared state of the slash commands and the event handler
pub struct Data {
    pub events: EventSender,
    pub web_url: String,
}

fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    // Create log buffer for the admin API
    let log_buffer = logging::create_log_buffer(logging::DEFAULT_CAPACITY);

    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::INFO)
        .with(logging::LogCaptureLayer::new(log_buffer.clone()))
        .init();

    let token = std::env::var("DISCORD_BOT_TOKEN")
        .context("Missing DISCORD_BOT_TOKEN environment variable")?;

    let store = config::create_shared_config_store(&args.config);
    info!("Using configuration file {}", store.path().display());

    let (bridge, tasks) = bridge::channel(Duration::from_secs(args.publish_timeout_secs));
    let (platform_tx, platform_rx) = oneshot::channel();

    let settings = GatewaySettings {
        token,
        web_url: args.web_url.clone(),
        command_guild: args
            .guild_id
            .filter(|id| *id != 0)
            .map(serenity::GuildId::new),
    };
    if let Some(guild_id) = settings.command_guild {
        info!("--guild-id: registering commands in guild {} only", guild_id);
    } else {
        info!("Registering commands globally (takes up to 1 hour to propagate)");
    }

    let gateway_exit = gateway::spawn(settings, store.clone(), tasks, platform_tx)
        .context("Failed to start gateway thread")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build web runtime")?;

    runtime.block_on(async move {
        let platform: SharedPlatform = match platform_rx.await {
            Ok(platform) => platform,
            // The client was never built; the exit result says why.
            Err(_) => return gateway_outcome(gateway_exit.await),
        };

        let state = web::ApiState {
            store,
            platform,
            bridge,
            log_buffer,
        };
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Ctrl-C received, shutting down");
        };

        tokio::select! {
            served = web::start_web_server(web::WebServerConfig { port: args.port }, state, shutdown) => served,
            exit = gateway_exit => gateway_outcome(exit),
        }
    })
}

fn gateway_outcome(exit: std::result::Result<Result<()>, oneshot::error::RecvError>) -> Result<()> {
    match exit {
        Ok(Ok(())) => {
            warn!("Gateway stopped, exiting");
            Ok(())
        }
        Ok(Err(e)) => {
            error!("Gateway failed: {:#}", e);
            Err(e)
        }
        Err(_) => Err(anyhow::anyhow!("Gateway thread stopped unexpectedly")),
    }
}
