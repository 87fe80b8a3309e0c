use tracing::{error, info, warn};

use super::JoinEvent;
use crate::audit::{self, AuditEntry, Severity};
use crate::config::ConfigStore;
use crate::error::BotError;
use crate::messages;
use crate::platform::{Outgoing, Platform};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Admitted,
    Rejected,
}

/// Apply the account-age gate to a new member.
///
/// Each side effect is attempted independently: a refused DM never stops the
/// kick, and a failed kick never stops the audit entry.
pub async fn handle_member_join(
    platform: &dyn Platform,
    store: &ConfigStore,
    event: &JoinEvent,
) -> JoinOutcome {
    let config = store.snapshot();
    let age_hours = event.account_age_hours();
    let min_hours = config.min_account_age_hours;

    if age_hours >= min_hours {
        audit::record(
            platform,
            &config,
            event.guild_id,
            AuditEntry::new(Severity::Info, "New Member", "A new user joined the server.")
                .field("👤 User", format!("{} (`{}`)", event.mention(), event.tag), true)
                .field("🆔 ID", format!("`{}`", event.user_id), true)
                .field(
                    "📅 Joined",
                    format!("<t:{}:R>", event.received_at.timestamp()),
                    false,
                ),
        )
        .await;
        return JoinOutcome::Admitted;
    }

    let guild_name = platform
        .guild(event.guild_id)
        .map(|g| g.name)
        .unwrap_or_else(|| event.guild_id.to_string());

    let notice = messages::account_too_new_message(&guild_name, age_hours, min_hours);
    if let Err(e) = platform.send_dm(event.user_id, Outgoing::Text(notice)).await {
        warn!("Could not DM {} ({}) before removal: {}", event.tag, event.user_id, e);
    }

    match platform
        .kick(event.guild_id, event.user_id, &messages::kick_reason(min_hours))
        .await
    {
        Ok(()) => info!(
            "Removed {} ({}) from guild {}: account is {:.1}h old",
            event.tag, event.user_id, event.guild_id, age_hours
        ),
        Err(BotError::PermissionDenied { message }) => error!(
            "Missing permission to remove {} from guild {}: {}",
            event.user_id, event.guild_id, message
        ),
        Err(e) => error!(
            "Failed to remove {} from guild {}: {}",
            event.user_id, event.guild_id, e
        ),
    }

    audit::record(
        platform,
        &config,
        event.guild_id,
        AuditEntry::new(
            Severity::Rejection,
            "User Removed - New Account",
            "A user was removed because their account is too new.",
        )
        .field("👤 User", format!("{} (`{}`)", event.mention(), event.tag), true)
        .field("🆔 ID", format!("`{}`", event.user_id), true)
        .field("⏰ Age", format!("{:.1} hours", age_hours), true)
        .field(
            "📅 Created",
            format!("<t:{}:R>", event.account_created.timestamp()),
            false,
        ),
    )
    .await;

    JoinOutcome::Rejected
}
