//! The platform connection.
//!
//! Owns the poise framework and serenity client. Runs on its own
//! single-threaded runtime; see [`spawn`].

pub mod dispatcher;

pub use dispatcher::{Dispatcher, EventSender};

use anyhow::Context as _;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use crate::bridge::TaskReceiver;
use crate::commands::{bot_info, panel};
use crate::config::SharedConfigStore;
use crate::events::{ReactionKind, VerificationEvent};
use crate::messages;
use crate::platform::{DiscordPlatform, SharedPlatform};
use crate::{Data, Error};

pub struct GatewaySettings {
    pub token: String,
    pub web_url: String,
    /// Register slash commands in this guild only.
    pub command_guild: Option<serenity::GuildId>,
}

/// Start the gateway on a dedicated thread.
///
/// `platform_tx` receives the platform handle once the client is built. The
/// returned receiver resolves when the gateway stops; it errors if the thread
/// died without reporting.
pub fn spawn(
    settings: GatewaySettings,
    store: SharedConfigStore,
    tasks: TaskReceiver,
    platform_tx: oneshot::Sender<SharedPlatform>,
) -> std::io::Result<oneshot::Receiver<anyhow::Result<()>>> {
    let (exit_tx, exit_rx) = oneshot::channel();
    std::thread::Builder::new()
        .name("gateway".to_string())
        .spawn(move || {
            let result = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("Failed to build gateway runtime")
                .and_then(|runtime| runtime.block_on(run(settings, store, tasks, platform_tx)));
            let _ = exit_tx.send(result);
        })?;
    Ok(exit_rx)
}

async fn event_handler(
    _ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    let normalised = match event {
        serenity::FullEvent::GuildMemberAddition { new_member } => {
            Some(VerificationEvent::member_joined(new_member))
        }
        serenity::FullEvent::ReactionAdd { add_reaction } => {
            VerificationEvent::reaction(ReactionKind::Add, add_reaction)
        }
        serenity::FullEvent::ReactionRemove { removed_reaction } => {
            VerificationEvent::reaction(ReactionKind::Remove, removed_reaction)
        }
        _ => None,
    };

    if let Some(event) = normalised {
        if let Err(e) = data.events.send(event) {
            error!("Dispatch loop is gone, dropping {}", e.0.describe());
        }
    }
    Ok(())
}

async fn run(
    settings: GatewaySettings,
    store: SharedConfigStore,
    tasks: TaskReceiver,
    platform_tx: oneshot::Sender<SharedPlatform>,
) -> anyhow::Result<()> {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let web_url = settings.web_url.clone();
    let command_guild = settings.command_guild;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![panel(), bot_info()],
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            pre_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command '{}' invoked by {} ({}) in {}",
                        ctx.command().qualified_name,
                        ctx.author().name,
                        ctx.author().id,
                        ctx.guild_id()
                            .map(|g| g.to_string())
                            .unwrap_or_else(|| "DM".to_string())
                    );
                })
            },
            on_error: |error| {
                Box::pin(async move {
                    match error {
                        poise::FrameworkError::Command { error, ctx, .. } => {
                            error!("Error in command '{}': {}", ctx.command().qualified_name, error);
                            let _ = ctx.say("Something went wrong, please try again.").await;
                        }
                        poise::FrameworkError::MissingUserPermissions { missing_permissions, ctx, .. } => {
                            warn!(
                                "User {} missing permissions for '{}': {:?}",
                                ctx.author().name,
                                ctx.command().qualified_name,
                                missing_permissions
                            );
                            let _ = ctx
                                .send(
                                    poise::CreateReply::default()
                                        .content("❌ You need the Administrator permission to use this command.")
                                        .ephemeral(true),
                                )
                                .await;
                        }
                        poise::FrameworkError::GuildOnly { ctx, .. } => {
                            let _ = ctx.say("This command only works in a server.").await;
                        }
                        other => {
                            if let Err(e) = poise::builtins::on_error(other).await {
                                error!("Error while handling framework error: {}", e);
                            }
                        }
                    }
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Bot logged in as: {} ({})", ready.user.name, ready.user.id);
                info!("Connected to {} guild(s)", ready.guilds.len());

                let commands = &framework.options().commands;
                let registered = match command_guild {
                    Some(guild_id) => {
                        poise::builtins::register_in_guild(ctx, commands, guild_id).await
                    }
                    None => poise::builtins::register_globally(ctx, commands).await,
                };
                match (registered, command_guild) {
                    (Ok(()), Some(guild_id)) => {
                        info!("Registered {} commands in guild {}", commands.len(), guild_id)
                    }
                    (Ok(()), None) => info!(
                        "Registered {} commands globally (may take up to 1 hour to propagate)",
                        commands.len()
                    ),
                    (Err(e), _) => error!("Failed to register commands: {}", e),
                }

                ctx.set_presence(
                    Some(serenity::ActivityData::watching(format!(
                        "{} | /panel",
                        messages::BRAND
                    ))),
                    serenity::OnlineStatus::Online,
                );

                Ok(Data {
                    events: events_tx,
                    web_url,
                })
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged() | serenity::GatewayIntents::GUILD_MEMBERS;

    let mut client = serenity::ClientBuilder::new(&settings.token, intents)
        .framework(framework)
        .await
        .context("Failed to build gateway client")?;

    let platform: SharedPlatform = Arc::new(DiscordPlatform::new(
        client.cache.clone(),
        client.http.clone(),
    ));
    tokio::spawn(Dispatcher::new(platform.clone(), store).run(events_rx, tasks));

    if platform_tx.send(platform).is_err() {
        warn!("Nobody is waiting for the gateway; continuing anyway");
    }

    info!("Starting gateway...");
    if let Err(e) = client.start().await {
        let message = e.to_string();
        if message.contains("Disallowed") || message.contains("intents") {
            error!("Failed to start gateway: {}", e);
            error!("Enable the GUILD_MEMBERS privileged intent in the Discord Developer Portal:");
            error!("https://discord.com/developers/applications -> Your App -> Bot -> Privileged Gateway Intents");
        }
        return Err(e.into());
    }
    warn!("Gateway ended.");

    Ok(())
}
