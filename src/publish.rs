//! Publishing the verification message.

use poise::serenity_prelude::{ChannelId, GuildId, MessageId, RoleId};
use serde::Serialize;
use tracing::{info, warn};

use crate::audit::{self, AuditEntry, Severity};
use crate::config::snowflake::serialize_id;
use crate::config::{ConfigStore, VerificationEmoji, VerifyConfig};
use crate::error::{BotError, Result};
use crate::messages;
use crate::platform::{Notice, Outgoing, Platform};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishReceipt {
    #[serde(serialize_with = "serialize_id")]
    pub message_id: u64,
    #[serde(serialize_with = "serialize_id")]
    pub channel_id: u64,
    pub emoji: String,
}

/// Everything a publish needs, resolved before the first side effect.
struct PublishPlan {
    channel_id: ChannelId,
    emoji: VerificationEmoji,
    notice: Notice,
}

/// Check that `config` can be published in `guild_id`.
///
/// Shared with the admin API so that obvious mistakes are reported without a
/// round trip through the gateway.
pub fn validate(platform: &dyn Platform, config: &VerifyConfig, guild_id: GuildId) -> Result<()> {
    plan(platform, config, guild_id).map(|_| ())
}

fn plan(platform: &dyn Platform, config: &VerifyConfig, guild_id: GuildId) -> Result<PublishPlan> {
    let guild = platform.guild(guild_id).ok_or_else(|| BotError::GuildNotFound {
        id: guild_id.to_string(),
    })?;

    let (Some(channel_id), Some(role_id)) = (config.verify_channel_id, config.verify_role_id) else {
        return Err(BotError::validation("Configure the role and channel first"));
    };
    let channel_id = ChannelId::new(channel_id);
    let role_id = RoleId::new(role_id);

    let emoji = config
        .verification_emoji()
        .ok_or_else(|| BotError::validation("Configure the verification emoji first"))?;

    if !platform.has_text_channel(guild_id, channel_id) {
        return Err(BotError::ChannelNotFound {
            id: channel_id.to_string(),
        });
    }
    if !platform.has_role(guild_id, role_id) {
        return Err(BotError::RoleNotFound {
            id: role_id.to_string(),
        });
    }
    if let VerificationEmoji::Custom { id, .. } = &emoji {
        if platform.emoji(guild_id, *id).is_none() {
            return Err(BotError::EmojiNotFound { id: id.to_string() });
        }
    }

    let notice = Notice::new(&config.title, &config.description, config.color)
        .image(config.image())
        .footer(messages::verification_footer(), guild.icon);

    Ok(PublishPlan {
        channel_id,
        emoji,
        notice,
    })
}

/// Send the verification message, react to it and record its id.
///
/// Runs on the gateway. Fails without touching the configuration unless
/// both the message and its reaction went through.
pub async fn publish_verification(
    platform: &dyn Platform,
    store: &ConfigStore,
    guild_id: GuildId,
) -> Result<PublishReceipt> {
    let config = store.snapshot();
    let plan = plan(platform, &config, guild_id)?;

    let message_id = platform
        .send_message(plan.channel_id, Outgoing::Embed(plan.notice))
        .await?;

    if let Err(e) = platform
        .add_reaction(guild_id, plan.channel_id, message_id, &plan.emoji)
        .await
    {
        discard(platform, plan.channel_id, message_id).await;
        return Err(e);
    }

    store.set_verify_message(message_id.get());
    info!(
        "Verification message {} published in channel {} of guild {}",
        message_id, plan.channel_id, guild_id
    );

    audit::record(
        platform,
        &config,
        guild_id,
        AuditEntry::new(
            Severity::Success,
            "Verification Published",
            "The verification message was published.",
        )
        .field("📍 Channel", format!("<#{}>", plan.channel_id), true)
        .field("🔰 Emoji", plan.emoji.label(), true),
    )
    .await;

    Ok(PublishReceipt {
        message_id: message_id.get(),
        channel_id: plan.channel_id.get(),
        emoji: plan.emoji.label().to_string(),
    })
}

async fn discard(platform: &dyn Platform, channel_id: ChannelId, message_id: MessageId) {
    if let Err(e) = platform.delete_message(channel_id, message_id).await {
        warn!(
            "Could not delete unreacted verification message {} in {}: {}",
            message_id, channel_id, e
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::reaction::{handle_reaction, ReactionOutcome};
    use crate::events::{ReactionEvent, ReactionKind};
    use crate::config::ReactionEmoji;
    use crate::platform::mock::{Call, MockPlatform, Op, CHANNEL, EMOJI, GUILD, LOG_CHANNEL, ROLE};
    use chrono::Utc;
    use poise::serenity_prelude::UserId;
    use serde_json::json;

    fn configured(dir: &tempfile::TempDir) -> ConfigStore {
        let store = ConfigStore::load(dir.path().join("config.json"));
        store.set("verify_channel_id", json!(CHANNEL.to_string())).unwrap();
        store.set("verify_role_id", json!(ROLE.to_string())).unwrap();
        store.set("log_channel_id", json!(LOG_CHANNEL.to_string())).unwrap();
        store
    }

    #[tokio::test]
    async fn test_publish_records_message_and_enables_verification() {
        let dir = tempfile::tempdir().unwrap();
        let platform = MockPlatform::new();
        platform.add_member(5, &[]);
        let store = configured(&dir);

        let receipt = publish_verification(&platform, &store, GuildId::new(GUILD))
            .await
            .unwrap();

        assert_eq!(store.snapshot().verify_message_id, Some(receipt.message_id));
        let reloaded = ConfigStore::load(dir.path().join("config.json"));
        assert_eq!(reloaded.snapshot().verify_message_id, Some(receipt.message_id));

        let calls = platform.calls();
        assert!(matches!(&calls[0], Call::Send { channel, .. } if channel.get() == CHANNEL));
        assert!(matches!(
            &calls[1],
            Call::React { message, emoji: VerificationEmoji::Literal(e) }
                if message.get() == receipt.message_id && e == "✅"
        ));
        assert_eq!(
            platform.audit_titles(),
            vec!["📋 Verification Published".to_string()]
        );

        let event = ReactionEvent {
            kind: ReactionKind::Add,
            user_id: UserId::new(5),
            guild_id: Some(GuildId::new(GUILD)),
            channel_id: ChannelId::new(CHANNEL),
            message_id: MessageId::new(receipt.message_id),
            emoji: ReactionEmoji::Unicode("✅".to_string()),
            received_at: Utc::now(),
        };
        assert_eq!(
            handle_reaction(&platform, &store, &event).await,
            ReactionOutcome::Granted
        );
    }

    #[tokio::test]
    async fn test_missing_role_or_channel_has_no_side_effects() {
        let dir = tempfile::tempdir().unwrap();
        let platform = MockPlatform::new();
        let store = ConfigStore::load(dir.path().join("config.json"));
        store.set("verify_channel_id", json!(CHANNEL)).unwrap();

        let err = publish_verification(&platform, &store, GuildId::new(GUILD))
            .await
            .unwrap_err();

        assert!(matches!(err, BotError::Validation { .. }));
        assert!(platform.calls().is_empty());
        assert_eq!(store.snapshot().verify_message_id, None);
    }

    #[tokio::test]
    async fn test_unknown_channel_and_role_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let platform = MockPlatform::new();
        let store = configured(&dir);

        store.set("verify_channel_id", json!("999")).unwrap();
        assert!(matches!(
            publish_verification(&platform, &store, GuildId::new(GUILD)).await,
            Err(BotError::ChannelNotFound { .. })
        ));

        store.set("verify_channel_id", json!(CHANNEL)).unwrap();
        store.set("verify_role_id", json!("999")).unwrap();
        assert!(matches!(
            publish_verification(&platform, &store, GuildId::new(GUILD)).await,
            Err(BotError::RoleNotFound { .. })
        ));

        assert!(matches!(
            publish_verification(&platform, &store, GuildId::new(404)).await,
            Err(BotError::GuildNotFound { .. })
        ));
        assert!(platform.calls().is_empty());
    }

    #[tokio::test]
    async fn test_custom_emoji_is_used_for_reaction() {
        let dir = tempfile::tempdir().unwrap();
        let platform = MockPlatform::new();
        let store = configured(&dir);
        store.set("use_server_emoji", json!(true)).unwrap();
        store.set("server_emoji_id", json!(EMOJI.to_string())).unwrap();
        store.set("server_emoji_name", json!("verify")).unwrap();

        let receipt = publish_verification(&platform, &store, GuildId::new(GUILD))
            .await
            .unwrap();
        assert_eq!(receipt.emoji, "verify");
        assert_eq!(
            platform.count(|c| matches!(
                c,
                Call::React { emoji: VerificationEmoji::Custom { id, .. }, .. } if *id == EMOJI
            )),
            1
        );

        store.set("server_emoji_id", json!("777")).unwrap();
        assert!(matches!(
            publish_verification(&platform, &store, GuildId::new(GUILD)).await,
            Err(BotError::EmojiNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_failed_reaction_discards_message_and_keeps_config() {
        let dir = tempfile::tempdir().unwrap();
        let platform = MockPlatform::new();
        platform.fail(Op::React);
        let store = configured(&dir);
        store.set("verify_message_id", json!("100")).unwrap();

        let result = publish_verification(&platform, &store, GuildId::new(GUILD)).await;

        assert!(matches!(result, Err(BotError::PermissionDenied { .. })));
        assert_eq!(store.snapshot().verify_message_id, Some(100));
        assert_eq!(platform.count(|c| matches!(c, Call::Delete { .. })), 1);
        assert!(platform.audit_titles().is_empty());
    }
}
