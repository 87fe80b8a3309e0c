//! The chat platform as seen by the policies and the admin API.
//!
//! Reads come from the gateway cache and never block; actions are remote
//! calls that may fail with permission or not-found errors.

pub mod discord;
#[cfg(test)]
pub mod mock;

use async_trait::async_trait;
use poise::serenity_prelude::{ChannelId, GuildId, MessageId, RoleId, UserId};
use serde::Serialize;

use crate::config::snowflake::serialize_id;
use crate::config::VerificationEmoji;
use crate::error::Result;

pub use discord::DiscordPlatform;

/// Placeholder category name for channels outside any category.
pub const UNCATEGORIZED: &str = "uncategorized";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuildSummary {
    #[serde(serialize_with = "serialize_id")]
    pub id: u64,
    pub name: String,
    pub icon: Option<String>,
    pub member_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleSummary {
    #[serde(serialize_with = "serialize_id")]
    pub id: u64,
    pub name: String,
    pub color: u32,
    pub position: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelSummary {
    #[serde(serialize_with = "serialize_id")]
    pub id: u64,
    pub name: String,
    pub category: String,
    pub position: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmojiSummary {
    #[serde(serialize_with = "serialize_id")]
    pub id: u64,
    pub name: String,
    pub url: String,
    pub animated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberSnapshot {
    pub user_id: UserId,
    pub tag: String,
    pub roles: Vec<RoleId>,
}

impl MemberSnapshot {
    pub fn has_role(&self, role_id: RoleId) -> bool {
        self.roles.contains(&role_id)
    }

    pub fn mention(&self) -> String {
        format!("<@{}>", self.user_id)
    }
}

/// Embed content, independent of the client library's builders.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub image_url: Option<String>,
    pub footer: Option<String>,
    pub footer_icon: Option<String>,
    pub fields: Vec<NoticeField>,
    pub timestamped: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoticeField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl Notice {
    pub fn new(title: impl Into<String>, description: impl Into<String>, color: u32) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            color,
            ..Default::default()
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(NoticeField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn image(mut self, url: Option<&str>) -> Self {
        self.image_url = url.map(str::to_string);
        self
    }

    pub fn footer(mut self, text: impl Into<String>, icon: Option<String>) -> Self {
        self.footer = Some(text.into());
        self.footer_icon = icon;
        self
    }

    pub fn timestamped(mut self) -> Self {
        self.timestamped = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing {
    Text(String),
    Embed(Notice),
}

#[async_trait]
pub trait Platform: Send + Sync {
    /// The bot's own user, once the gateway has identified.
    fn bot_user_id(&self) -> Option<UserId>;

    fn guilds(&self) -> Vec<GuildSummary>;

    fn guild(&self, guild_id: GuildId) -> Option<GuildSummary>;

    /// Roles without `@everyone`, highest position first. `None` if the guild is unknown.
    fn roles(&self, guild_id: GuildId) -> Option<Vec<RoleSummary>>;

    /// Text channels by position. `None` if the guild is unknown.
    fn text_channels(&self, guild_id: GuildId) -> Option<Vec<ChannelSummary>>;

    fn emojis(&self, guild_id: GuildId) -> Option<Vec<EmojiSummary>>;

    /// Cached member, fetched remotely on a cache miss.
    async fn member(&self, guild_id: GuildId, user_id: UserId) -> Option<MemberSnapshot>;

    async fn send_dm(&self, user_id: UserId, message: Outgoing) -> Result<()>;

    async fn kick(&self, guild_id: GuildId, user_id: UserId, reason: &str) -> Result<()>;

    async fn add_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        reason: &str,
    ) -> Result<()>;

    async fn remove_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        reason: &str,
    ) -> Result<()>;

    async fn send_message(&self, channel_id: ChannelId, message: Outgoing) -> Result<MessageId>;

    async fn add_reaction(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        message_id: MessageId,
        emoji: &VerificationEmoji,
    ) -> Result<()>;

    async fn delete_message(&self, channel_id: ChannelId, message_id: MessageId) -> Result<()>;

    fn has_role(&self, guild_id: GuildId, role_id: RoleId) -> bool {
        self.roles(guild_id)
            .map(|roles| roles.iter().any(|r| r.id == role_id.get()))
            .unwrap_or(false)
    }

    fn has_text_channel(&self, guild_id: GuildId, channel_id: ChannelId) -> bool {
        self.text_channels(guild_id)
            .map(|channels| channels.iter().any(|c| c.id == channel_id.get()))
            .unwrap_or(false)
    }

    fn emoji(&self, guild_id: GuildId, emoji_id: u64) -> Option<EmojiSummary> {
        self.emojis(guild_id)?.into_iter().find(|e| e.id == emoji_id)
    }
}

pub type SharedPlatform = std::sync::Arc<dyn Platform>;
