use async_trait::async_trait;
use poise::serenity_prelude::{
    self as serenity, Cache, ChannelId, ChannelType, CreateEmbed, CreateEmbedFooter,
    CreateMessage, EmojiId, GuildId, Http, MessageId, ReactionType, RoleId, UserId,
};
use std::sync::Arc;
use tracing::debug;

use super::{
    ChannelSummary, EmojiSummary, GuildSummary, MemberSnapshot, Notice, Outgoing, Platform,
    RoleSummary, UNCATEGORIZED,
};
use crate::config::VerificationEmoji;
use crate::error::Result;

/// Platform backed by the gateway's cache and REST client.
#[derive(Clone)]
pub struct DiscordPlatform {
    cache: Arc<Cache>,
    http: Arc<Http>,
}

impl DiscordPlatform {
    pub fn new(cache: Arc<Cache>, http: Arc<Http>) -> Self {
        Self { cache, http }
    }

    fn reaction_type(&self, guild_id: GuildId, emoji: &VerificationEmoji) -> ReactionType {
        match emoji {
            VerificationEmoji::Literal(literal) => ReactionType::Unicode(literal.clone()),
            VerificationEmoji::Custom { id, name } => {
                let animated = self.emoji(guild_id, *id).map(|e| e.animated).unwrap_or(false);
                ReactionType::Custom {
                    animated,
                    id: EmojiId::new(*id),
                    name: Some(name.clone()),
                }
            }
        }
    }
}

fn snapshot_member(member: &serenity::Member) -> MemberSnapshot {
    MemberSnapshot {
        user_id: member.user.id,
        tag: member.user.tag(),
        roles: member.roles.clone(),
    }
}

pub fn embed_from(notice: &Notice) -> CreateEmbed {
    let mut embed = CreateEmbed::new()
        .title(&notice.title)
        .description(&notice.description)
        .colour(notice.color);

    if let Some(url) = &notice.image_url {
        embed = embed.image(url);
    }
    if let Some(text) = &notice.footer {
        let mut footer = CreateEmbedFooter::new(text);
        if let Some(icon) = &notice.footer_icon {
            footer = footer.icon_url(icon);
        }
        embed = embed.footer(footer);
    }
    for field in &notice.fields {
        embed = embed.field(&field.name, &field.value, field.inline);
    }
    if notice.timestamped {
        embed = embed.timestamp(serenity::Timestamp::now());
    }
    embed
}

/// Text and announcement channels; both can carry the verification message.
fn holds_messages(kind: ChannelType) -> bool {
    matches!(kind, ChannelType::Text | ChannelType::News)
}

fn message_from(message: Outgoing) -> CreateMessage {
    match message {
        Outgoing::Text(content) => CreateMessage::new().content(content),
        Outgoing::Embed(notice) => CreateMessage::new().embed(embed_from(&notice)),
    }
}

#[async_trait]
impl Platform for DiscordPlatform {
    fn bot_user_id(&self) -> Option<UserId> {
        let id = self.cache.current_user().id;
        (id.get() != 0).then_some(id)
    }

    fn guilds(&self) -> Vec<GuildSummary> {
        let mut guilds: Vec<GuildSummary> = self
            .cache
            .guilds()
            .into_iter()
            .filter_map(|id| self.guild(id))
            .collect();
        guilds.sort_by(|a, b| a.name.cmp(&b.name));
        guilds
    }

    fn guild(&self, guild_id: GuildId) -> Option<GuildSummary> {
        let guild = self.cache.guild(guild_id)?;
        Some(GuildSummary {
            id: guild.id.get(),
            name: guild.name.clone(),
            icon: guild.icon_url(),
            member_count: guild.member_count,
        })
    }

    fn roles(&self, guild_id: GuildId) -> Option<Vec<RoleSummary>> {
        let guild = self.cache.guild(guild_id)?;
        let mut roles: Vec<RoleSummary> = guild
            .roles
            .values()
            // @everyone shares the guild's id
            .filter(|role| role.id.get() != guild.id.get())
            .map(|role| RoleSummary {
                id: role.id.get(),
                name: role.name.clone(),
                color: role.colour.0,
                position: role.position,
            })
            .collect();
        roles.sort_by(|a, b| b.position.cmp(&a.position));
        Some(roles)
    }

    fn text_channels(&self, guild_id: GuildId) -> Option<Vec<ChannelSummary>> {
        let guild = self.cache.guild(guild_id)?;
        let mut channels: Vec<ChannelSummary> = guild
            .channels
            .values()
            .filter(|channel| holds_messages(channel.kind))
            .map(|channel| ChannelSummary {
                id: channel.id.get(),
                name: channel.name.clone(),
                category: channel
                    .parent_id
                    .and_then(|parent| guild.channels.get(&parent))
                    .map(|parent| parent.name.clone())
                    .unwrap_or_else(|| UNCATEGORIZED.to_string()),
                position: channel.position,
            })
            .collect();
        channels.sort_by_key(|c| c.position);
        Some(channels)
    }

    fn emojis(&self, guild_id: GuildId) -> Option<Vec<EmojiSummary>> {
        let guild = self.cache.guild(guild_id)?;
        let mut emojis: Vec<EmojiSummary> = guild
            .emojis
            .values()
            .map(|emoji| EmojiSummary {
                id: emoji.id.get(),
                name: emoji.name.clone(),
                url: emoji.url(),
                animated: emoji.animated,
            })
            .collect();
        emojis.sort_by(|a, b| a.name.cmp(&b.name));
        Some(emojis)
    }

    async fn member(&self, guild_id: GuildId, user_id: UserId) -> Option<MemberSnapshot> {
        let cached = self
            .cache
            .guild(guild_id)
            .and_then(|guild| guild.members.get(&user_id).map(snapshot_member));
        if cached.is_some() {
            return cached;
        }

        match guild_id.member(&self.http, user_id).await {
            Ok(member) => Some(snapshot_member(&member)),
            Err(e) => {
                debug!("Member {} not resolvable in guild {}: {}", user_id, guild_id, e);
                None
            }
        }
    }

    async fn send_dm(&self, user_id: UserId, message: Outgoing) -> Result<()> {
        let channel = user_id.create_dm_channel(&self.http).await?;
        channel.send_message(&self.http, message_from(message)).await?;
        Ok(())
    }

    async fn kick(&self, guild_id: GuildId, user_id: UserId, reason: &str) -> Result<()> {
        guild_id.kick_with_reason(&self.http, user_id, reason).await?;
        Ok(())
    }

    async fn add_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        reason: &str,
    ) -> Result<()> {
        self.http
            .add_member_role(guild_id, user_id, role_id, Some(reason))
            .await?;
        Ok(())
    }

    async fn remove_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        reason: &str,
    ) -> Result<()> {
        self.http
            .remove_member_role(guild_id, user_id, role_id, Some(reason))
            .await?;
        Ok(())
    }

    async fn send_message(&self, channel_id: ChannelId, message: Outgoing) -> Result<MessageId> {
        let sent = channel_id
            .send_message(&self.http, message_from(message))
            .await?;
        Ok(sent.id)
    }

    async fn add_reaction(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        message_id: MessageId,
        emoji: &VerificationEmoji,
    ) -> Result<()> {
        let reaction = self.reaction_type(guild_id, emoji);
        channel_id
            .create_reaction(&self.http, message_id, reaction)
            .await?;
        Ok(())
    }

    async fn delete_message(&self, channel_id: ChannelId, message_id: MessageId) -> Result<()> {
        channel_id.delete_message(&self.http, message_id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listed_channel_kinds() {
        assert!(holds_messages(ChannelType::Text));
        assert!(holds_messages(ChannelType::News));
        assert!(!holds_messages(ChannelType::Voice));
        assert!(!holds_messages(ChannelType::Category));
    }
}
