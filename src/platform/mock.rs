//! In-memory platform for policy and API tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use poise::serenity_prelude::{ChannelId, GuildId, MessageId, RoleId, UserId};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use super::{
    ChannelSummary, EmojiSummary, GuildSummary, MemberSnapshot, Outgoing, Platform, RoleSummary,
    UNCATEGORIZED,
};
use crate::config::VerificationEmoji;
use crate::error::{BotError, Result};

pub const BOT_ID: u64 = 1;
pub const GUILD: u64 = 10;
pub const ROLE: u64 = 20;
pub const CHANNEL: u64 = 30;
pub const LOG_CHANNEL: u64 = 31;
pub const EMOJI: u64 = 555;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Dm { user: UserId, message: Outgoing },
    Kick { guild: GuildId, user: UserId, reason: String },
    AddRole { user: UserId, role: RoleId },
    RemoveRole { user: UserId, role: RoleId },
    Send { channel: ChannelId, message: Outgoing, id: MessageId },
    React { message: MessageId, emoji: VerificationEmoji },
    Delete { message: MessageId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Dm,
    Kick,
    AddRole,
    RemoveRole,
    Send,
    React,
}

#[derive(Default)]
struct MockGuild {
    name: String,
    roles: Vec<RoleSummary>,
    channels: Vec<ChannelSummary>,
    emojis: Vec<EmojiSummary>,
    members: HashMap<UserId, MemberSnapshot>,
}

pub struct MockPlatform {
    guilds: Mutex<HashMap<GuildId, MockGuild>>,
    calls: Mutex<Vec<Call>>,
    failing: Mutex<HashSet<Op>>,
    next_message: AtomicU64,
}

impl MockPlatform {
    /// One guild with the verify role, a text channel, a log channel and a custom emoji.
    pub fn new() -> Self {
        let guild = MockGuild {
            name: "Test Guild".to_string(),
            roles: vec![RoleSummary {
                id: ROLE,
                name: "Verified".to_string(),
                color: 0x2ecc71,
                position: 1,
            }],
            channels: vec![
                ChannelSummary {
                    id: CHANNEL,
                    name: "verify".to_string(),
                    category: UNCATEGORIZED.to_string(),
                    position: 0,
                },
                ChannelSummary {
                    id: LOG_CHANNEL,
                    name: "logs".to_string(),
                    category: "Staff".to_string(),
                    position: 1,
                },
            ],
            emojis: vec![EmojiSummary {
                id: EMOJI,
                name: "verify".to_string(),
                url: format!("https://cdn.discordapp.com/emojis/{}.png", EMOJI),
                animated: false,
            }],
            members: HashMap::new(),
        };

        let mut guilds = HashMap::new();
        guilds.insert(GuildId::new(GUILD), guild);

        Self {
            guilds: Mutex::new(guilds),
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            next_message: AtomicU64::new(1000),
        }
    }

    pub fn add_member(&self, user_id: u64, roles: &[u64]) {
        let mut guilds = self.guilds.lock();
        let guild = guilds.get_mut(&GuildId::new(GUILD)).expect("test guild");
        guild.members.insert(
            UserId::new(user_id),
            MemberSnapshot {
                user_id: UserId::new(user_id),
                tag: format!("user{}", user_id),
                roles: roles.iter().map(|r| RoleId::new(*r)).collect(),
            },
        );
    }

    pub fn add_role(&self, id: u64, name: &str, position: u16) {
        let mut guilds = self.guilds.lock();
        let guild = guilds.get_mut(&GuildId::new(GUILD)).expect("test guild");
        guild.roles.push(RoleSummary {
            id,
            name: name.to_string(),
            color: 0,
            position,
        });
    }

    pub fn fail(&self, op: Op) {
        self.failing.lock().insert(op);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    /// Embeds sent to the log channel, by title.
    pub fn audit_titles(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                Call::Send {
                    channel,
                    message: Outgoing::Embed(notice),
                    ..
                } if channel.get() == LOG_CHANNEL => Some(notice.title.clone()),
                _ => None,
            })
            .collect()
    }

    fn check(&self, op: Op) -> Result<()> {
        if self.failing.lock().contains(&op) {
            Err(BotError::PermissionDenied {
                message: format!("{:?} refused", op),
            })
        } else {
            Ok(())
        }
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl Platform for MockPlatform {
    fn bot_user_id(&self) -> Option<UserId> {
        Some(UserId::new(BOT_ID))
    }

    fn guilds(&self) -> Vec<GuildSummary> {
        let ids: Vec<GuildId> = self.guilds.lock().keys().copied().collect();
        ids.into_iter()
            .filter_map(|id| self.guild_summary(id))
            .collect()
    }

    fn guild(&self, guild_id: GuildId) -> Option<GuildSummary> {
        self.guild_summary(guild_id)
    }

    fn roles(&self, guild_id: GuildId) -> Option<Vec<RoleSummary>> {
        let guilds = self.guilds.lock();
        let mut roles = guilds.get(&guild_id)?.roles.clone();
        roles.sort_by(|a, b| b.position.cmp(&a.position));
        Some(roles)
    }

    fn text_channels(&self, guild_id: GuildId) -> Option<Vec<ChannelSummary>> {
        Some(self.guilds.lock().get(&guild_id)?.channels.clone())
    }

    fn emojis(&self, guild_id: GuildId) -> Option<Vec<EmojiSummary>> {
        Some(self.guilds.lock().get(&guild_id)?.emojis.clone())
    }

    async fn member(&self, guild_id: GuildId, user_id: UserId) -> Option<MemberSnapshot> {
        self.guilds
            .lock()
            .get(&guild_id)?
            .members
            .get(&user_id)
            .cloned()
    }

    async fn send_dm(&self, user_id: UserId, message: Outgoing) -> Result<()> {
        self.check(Op::Dm)?;
        self.record(Call::Dm {
            user: user_id,
            message,
        });
        Ok(())
    }

    async fn kick(&self, guild_id: GuildId, user_id: UserId, reason: &str) -> Result<()> {
        self.check(Op::Kick)?;
        if let Some(guild) = self.guilds.lock().get_mut(&guild_id) {
            guild.members.remove(&user_id);
        }
        self.record(Call::Kick {
            guild: guild_id,
            user: user_id,
            reason: reason.to_string(),
        });
        Ok(())
    }

    async fn add_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        _reason: &str,
    ) -> Result<()> {
        self.check(Op::AddRole)?;
        if let Some(member) = self
            .guilds
            .lock()
            .get_mut(&guild_id)
            .and_then(|g| g.members.get_mut(&user_id))
        {
            member.roles.push(role_id);
        }
        self.record(Call::AddRole {
            user: user_id,
            role: role_id,
        });
        Ok(())
    }

    async fn remove_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        _reason: &str,
    ) -> Result<()> {
        self.check(Op::RemoveRole)?;
        if let Some(member) = self
            .guilds
            .lock()
            .get_mut(&guild_id)
            .and_then(|g| g.members.get_mut(&user_id))
        {
            member.roles.retain(|r| *r != role_id);
        }
        self.record(Call::RemoveRole {
            user: user_id,
            role: role_id,
        });
        Ok(())
    }

    async fn send_message(&self, channel_id: ChannelId, message: Outgoing) -> Result<MessageId> {
        self.check(Op::Send)?;
        let id = MessageId::new(self.next_message.fetch_add(1, Ordering::SeqCst));
        self.record(Call::Send {
            channel: channel_id,
            message,
            id,
        });
        Ok(id)
    }

    async fn add_reaction(
        &self,
        _guild_id: GuildId,
        _channel_id: ChannelId,
        message_id: MessageId,
        emoji: &VerificationEmoji,
    ) -> Result<()> {
        self.check(Op::React)?;
        self.record(Call::React {
            message: message_id,
            emoji: emoji.clone(),
        });
        Ok(())
    }

    async fn delete_message(&self, _channel_id: ChannelId, message_id: MessageId) -> Result<()> {
        self.record(Call::Delete {
            message: message_id,
        });
        Ok(())
    }
}

impl MockPlatform {
    fn guild_summary(&self, guild_id: GuildId) -> Option<GuildSummary> {
        let guilds = self.guilds.lock();
        let guild = guilds.get(&guild_id)?;
        Some(GuildSummary {
            id: guild_id.get(),
            name: guild.name.clone(),
            icon: None,
            member_count: guild.members.len() as u64,
        })
    }
}
