//! Gateway notifications, normalised for the policies.

pub mod member;
pub mod reaction;

pub use member::handle_member_join;
pub use reaction::handle_reaction;

use chrono::{DateTime, Utc};
use poise::serenity_prelude::{self as serenity, ChannelId, GuildId, MessageId, UserId};

use crate::config::ReactionEmoji;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionKind {
    Add,
    Remove,
}

/// Short-lived view of one notification; dropped once handled.
#[derive(Debug, Clone)]
pub enum VerificationEvent {
    MemberJoined(JoinEvent),
    Reaction(ReactionEvent),
}

#[derive(Debug, Clone)]
pub struct JoinEvent {
    pub user_id: UserId,
    pub guild_id: GuildId,
    pub tag: String,
    pub account_created: DateTime<Utc>,
    pub received_at: DateTime<Utc>,
}

impl JoinEvent {
    pub fn account_age_hours(&self) -> f64 {
        (self.received_at - self.account_created).num_milliseconds() as f64 / 3_600_000.0
    }

    pub fn mention(&self) -> String {
        format!("<@{}>", self.user_id)
    }
}

#[derive(Debug, Clone)]
pub struct ReactionEvent {
    pub kind: ReactionKind,
    pub user_id: UserId,
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub emoji: ReactionEmoji,
    pub received_at: DateTime<Utc>,
}

/// Milliseconds between the Unix epoch and the first Discord snowflake.
const DISCORD_EPOCH_MS: i64 = 1_420_070_400_000;

/// Creation time encoded in a user snowflake, to the millisecond.
fn account_created(user_id: UserId) -> DateTime<Utc> {
    let millis = (user_id.get() >> 22) as i64 + DISCORD_EPOCH_MS;
    DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
}

impl From<&serenity::ReactionType> for ReactionEmoji {
    fn from(reaction: &serenity::ReactionType) -> Self {
        match reaction {
            serenity::ReactionType::Custom { animated, id, name } => ReactionEmoji::Custom {
                id: id.get(),
                name: name.clone(),
                animated: *animated,
            },
            serenity::ReactionType::Unicode(s) => ReactionEmoji::Unicode(s.clone()),
            other => ReactionEmoji::Unicode(other.to_string()),
        }
    }
}

impl VerificationEvent {
    pub fn member_joined(member: &serenity::Member) -> Self {
        VerificationEvent::MemberJoined(JoinEvent {
            user_id: member.user.id,
            guild_id: member.guild_id,
            tag: member.user.tag(),
            account_created: account_created(member.user.id),
            received_at: Utc::now(),
        })
    }

    /// `None` for reactions without a user, which the gateway never sends for guild messages.
    pub fn reaction(kind: ReactionKind, reaction: &serenity::Reaction) -> Option<Self> {
        Some(VerificationEvent::Reaction(ReactionEvent {
            kind,
            user_id: reaction.user_id?,
            guild_id: reaction.guild_id,
            channel_id: reaction.channel_id,
            message_id: reaction.message_id,
            emoji: ReactionEmoji::from(&reaction.emoji),
            received_at: Utc::now(),
        }))
    }

    pub fn describe(&self) -> String {
        match self {
            VerificationEvent::MemberJoined(join) => {
                format!("member join of {} in guild {}", join.user_id, join.guild_id)
            }
            VerificationEvent::Reaction(reaction) => format!(
                "reaction {:?} by {} on message {}",
                reaction.kind, reaction.user_id, reaction.message_id
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_account_age_hours() {
        let now = Utc::now();
        let join = JoinEvent {
            user_id: UserId::new(5),
            guild_id: GuildId::new(10),
            tag: "user5".to_string(),
            account_created: now - Duration::minutes(90),
            received_at: now,
        };
        assert!((join.account_age_hours() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_account_created_keeps_milliseconds() {
        // 2016-04-30T11:18:25.796Z
        let created = account_created(UserId::new(175928847299117063));
        assert_eq!(created.timestamp_millis(), 1_462_015_105_796);
    }

    #[test]
    fn test_reaction_type_conversion() {
        let custom = serenity::ReactionType::Custom {
            animated: true,
            id: serenity::EmojiId::new(555),
            name: Some("verify".to_string()),
        };
        assert_eq!(
            ReactionEmoji::from(&custom),
            ReactionEmoji::Custom {
                id: 555,
                name: Some("verify".to_string()),
                animated: true
            }
        );
        let unicode = serenity::ReactionType::Unicode("✅".to_string());
        assert_eq!(
            ReactionEmoji::from(&unicode),
            ReactionEmoji::Unicode("✅".to_string())
        );
    }
}
