use poise::serenity_prelude::RoleId;
use tracing::{debug, error, info, warn};

use super::{ReactionEvent, ReactionKind};
use crate::audit::{self, AuditEntry, Severity};
use crate::config::ConfigStore;
use crate::messages;
use crate::platform::{Notice, Outgoing, Platform};

/// Why a reaction was ignored before any side effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    OwnReaction,
    OtherMessage,
    UnknownGuild,
    UnknownMember,
    OtherEmoji,
    RoleUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionOutcome {
    Skipped(Skip),
    Granted,
    AlreadyVerified,
    Revoked,
    NotVerified,
    Failed,
}

/// Toggle the verification role for a reaction on the verify message.
pub async fn handle_reaction(
    platform: &dyn Platform,
    store: &ConfigStore,
    event: &ReactionEvent,
) -> ReactionOutcome {
    let config = store.snapshot();

    if platform.bot_user_id() == Some(event.user_id) {
        return ReactionOutcome::Skipped(Skip::OwnReaction);
    }

    if config.verify_message_id != Some(event.message_id.get()) {
        return ReactionOutcome::Skipped(Skip::OtherMessage);
    }

    let Some(guild_id) = event.guild_id.filter(|id| platform.guild(*id).is_some()) else {
        return ReactionOutcome::Skipped(Skip::UnknownGuild);
    };

    let Some(member) = platform.member(guild_id, event.user_id).await else {
        debug!("Reacting user {} is no longer in guild {}", event.user_id, guild_id);
        return ReactionOutcome::Skipped(Skip::UnknownMember);
    };

    let matches = config
        .verification_emoji()
        .map(|emoji| emoji.matches(&event.emoji))
        .unwrap_or(false);
    if !matches {
        return ReactionOutcome::Skipped(Skip::OtherEmoji);
    }

    let Some(role_id) = config.verify_role_id.map(RoleId::new) else {
        return ReactionOutcome::Skipped(Skip::RoleUnavailable);
    };
    if !platform.has_role(guild_id, role_id) {
        error!("Verification role {} not found in guild {}", role_id, guild_id);
        return ReactionOutcome::Skipped(Skip::RoleUnavailable);
    }

    match event.kind {
        ReactionKind::Add => {
            if member.has_role(role_id) {
                info!("{} already has the verification role", member.tag);
                return ReactionOutcome::AlreadyVerified;
            }

            if let Err(e) = platform
                .add_role(guild_id, member.user_id, role_id, messages::GRANT_REASON)
                .await
            {
                error!(
                    "Failed to grant role {} to {} in guild {}: {}",
                    role_id, member.user_id, guild_id, e
                );
                return ReactionOutcome::Failed;
            }

            audit::record(
                platform,
                &config,
                guild_id,
                AuditEntry::new(Severity::Success, "User Verified", "A user verified successfully.")
                    .field("👤 User", format!("{} (`{}`)", member.mention(), member.tag), true)
                    .field("🆔 ID", format!("`{}`", member.user_id), true)
                    .field("✅ Role", format!("<@&{}>", role_id), true)
                    .field(
                        "📅 Verified",
                        format!("<t:{}:R>", event.received_at.timestamp()),
                        false,
                    ),
            )
            .await;
            info!("User verified: {} ({})", member.tag, member.user_id);

            let guild = platform.guild(guild_id);
            let guild_name = guild.as_ref().map(|g| g.name.as_str()).unwrap_or("the server");
            let confirmation = Notice::new(
                messages::VERIFIED_TITLE,
                messages::verified_message(guild_name),
                Severity::Success.color(),
            )
            .footer(messages::BRAND, guild.as_ref().and_then(|g| g.icon.clone()))
            .timestamped();
            if let Err(e) = platform
                .send_dm(member.user_id, Outgoing::Embed(confirmation))
                .await
            {
                warn!("Could not send confirmation DM to {}: {}", member.tag, e);
            }

            ReactionOutcome::Granted
        }
        ReactionKind::Remove => {
            if !member.has_role(role_id) {
                return ReactionOutcome::NotVerified;
            }

            if let Err(e) = platform
                .remove_role(guild_id, member.user_id, role_id, messages::REVOKE_REASON)
                .await
            {
                error!(
                    "Failed to revoke role {} from {} in guild {}: {}",
                    role_id, member.user_id, guild_id, e
                );
                return ReactionOutcome::Failed;
            }

            audit::record(
                platform,
                &config,
                guild_id,
                AuditEntry::new(
                    Severity::Warning,
                    "Verification Removed",
                    "A user removed their verification reaction.",
                )
                .field("👤 User", format!("{} (`{}`)", member.mention(), member.tag), true)
                .field("🆔 ID", format!("`{}`", member.user_id), true)
                .field("❌ Role Removed", format!("<@&{}>", role_id), true),
            )
            .await;
            info!("Verification removed: {} ({})", member.tag, member.user_id);

            ReactionOutcome::Revoked
        }
    }
}
