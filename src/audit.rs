//! Audit entries posted to the operator's log channel.

use poise::serenity_prelude::{ChannelId, GuildId};
use tracing::{error, info, warn};

use crate::config::VerifyConfig;
use crate::error::BotError;
use crate::messages::BRAND;
use crate::platform::{Notice, Outgoing, Platform};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Rejection,
}

impl Severity {
    pub fn color(self) -> u32 {
        match self {
            Severity::Info => 0x3498db,
            Severity::Success => 0x2ecc71,
            Severity::Warning => 0xf39c12,
            Severity::Rejection => 0xe74c3c,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Rejection => "rejection",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub fields: Vec<(String, String, bool)>,
}

impl AuditEntry {
    pub fn new(severity: Severity, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            severity,
            title: title.into(),
            description: description.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push((name.into(), value.into(), inline));
        self
    }

    fn to_notice(&self, guild_icon: Option<String>) -> Notice {
        let mut notice = Notice::new(format!("📋 {}", self.title), &self.description, self.severity.color())
            .footer(format!("{} • Audit log", BRAND), guild_icon)
            .timestamped();
        for (name, value, inline) in &self.fields {
            notice = notice.field(name, value, *inline);
        }
        notice
    }
}

/// Post `entry` to the configured log channel of `guild_id`.
///
/// Never fails: a missing channel or a refused send is logged and dropped.
pub async fn record(platform: &dyn Platform, config: &VerifyConfig, guild_id: GuildId, entry: AuditEntry) {
    info!(
        severity = entry.severity.as_str(),
        guild = %guild_id,
        "Audit: {} - {}",
        entry.title,
        entry.description
    );

    let Some(log_channel) = config.log_channel_id.map(ChannelId::new) else {
        return;
    };

    if !platform.has_text_channel(guild_id, log_channel) {
        warn!("Log channel {} not found in guild {}", log_channel, guild_id);
        return;
    }

    let icon = platform.guild(guild_id).and_then(|g| g.icon);
    match platform
        .send_message(log_channel, Outgoing::Embed(entry.to_notice(icon)))
        .await
    {
        Ok(_) => {}
        Err(BotError::PermissionDenied { message }) => {
            error!("No permission to post audit log in {}: {}", log_channel, message);
        }
        Err(e) => {
            error!("Failed to post audit log in {}: {}", log_channel, e);
        }
    }
}
