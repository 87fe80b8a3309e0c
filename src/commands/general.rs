use poise::serenity_prelude as serenity;
use std::time::Duration;

use crate::messages::{self, BRAND, COLOR_BRAND};
use crate::{Context, Error};

/// Open the verification web panel
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "ADMINISTRATOR",
    default_member_permissions = "ADMINISTRATOR"
)]
pub async fn panel(ctx: Context<'_>) -> Result<(), Error> {
    ctx.send(
        poise::CreateReply::default()
            .embed(panel_embed(&ctx.data().web_url))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Show information about the bot
#[poise::command(slash_command, rename = "info")]
pub async fn bot_info(ctx: Context<'_>) -> Result<(), Error> {
    let stats = {
        let cache = ctx.cache();
        let guilds = cache.guilds();
        let members = guilds
            .iter()
            .filter_map(|id| cache.guild(*id).map(|g| g.member_count))
            .sum();
        Stats {
            guilds: guilds.len(),
            members,
            latency: None,
        }
    };
    let latency = ctx.ping().await;
    let stats = Stats {
        latency: (!latency.is_zero()).then_some(latency),
        ..stats
    };

    // Only populated for interactions, which is all this command accepts.
    let is_admin = ctx
        .author_member()
        .await
        .and_then(|m| m.permissions)
        .is_some_and(|p| p.administrator());
    let panel_url = is_admin.then(|| ctx.data().web_url.clone());

    ctx.send(poise::CreateReply::default().embed(info_embed(&stats, panel_url.as_deref())))
        .await?;
    Ok(())
}

struct Stats {
    guilds: usize,
    members: u64,
    latency: Option<Duration>,
}

fn panel_embed(web_url: &str) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(format!("🎛️ {} Panel", BRAND))
        .description(messages::panel_description(web_url))
        .color(COLOR_BRAND)
        .footer(serenity::CreateEmbedFooter::new("Only administrators can use the panel"))
        .timestamp(serenity::Timestamp::now())
}

fn info_embed(stats: &Stats, panel_url: Option<&str>) -> serenity::CreateEmbed {
    let latency = stats
        .latency
        .map(|d| format!("{}ms", d.as_millis()))
        .unwrap_or_else(|| "unknown".to_string());

    let mut embed = serenity::CreateEmbed::new()
        .title(format!("🛡️ {}", BRAND))
        .description("Reaction-based verification with new-account protection.")
        .color(COLOR_BRAND)
        .field("✨ Features", messages::FEATURES, false)
        .field(
            "📊 Statistics",
            format!(
                "Servers: {}\nMembers: {}\nLatency: {}",
                stats.guilds, stats.members, latency
            ),
            false,
        );
    if let Some(url) = panel_url {
        embed = embed.field("🔗 Panel", url, false);
    }
    embed
        .footer(serenity::CreateEmbedFooter::new(format!(
            "{} v{}",
            BRAND,
            env!("CARGO_PKG_VERSION")
        )))
        .timestamp(serenity::Timestamp::now())
}
