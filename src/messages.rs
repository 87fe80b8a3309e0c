// src/messages.rs

pub const BRAND: &str = "Reactgate";
pub const COLOR_BRAND: u32 = 0x5865F2;

pub fn account_too_new_message(guild_name: &str, age_hours: f64, min_hours: f64) -> String {
    format!(
        "⚠️ **Account Too New**\n\n\
        Your account must be at least **{} hours** old to join **{}**.\n\n\
        **Current age:** {:.1} hours\n\
        **Required:** {} hours\n\n\
        Please try joining again once your account meets the requirement.",
        min_hours, guild_name, age_hours, min_hours
    )
}

pub fn kick_reason(min_hours: f64) -> String {
    format!("Account too new (<{}h) - {}", min_hours, BRAND)
}

pub const GRANT_REASON: &str = "Verified by reaction";
pub const REVOKE_REASON: &str = "Verification reaction removed";

pub const VERIFIED_TITLE: &str = "✅ Verification Successful!";

pub fn verified_message(guild_name: &str) -> String {
    format!(
        "You have been verified in **{}**.\n\nEnjoy the server!",
        guild_name
    )
}

pub fn verification_footer() -> String {
    format!("React with the emoji to verify • {}", BRAND)
}

pub fn panel_description(web_url: &str) -> String {
    format!(
        "Use the web panel to configure the verification system.\n\n\
        **🔗 Link:** {}\n\n\
        From the panel you can:\n\
        ✅ Choose the verification role and channel\n\
        ✅ Customise the verification message\n\
        ✅ Pick a server emoji\n\
        ✅ Publish the verification message",
        web_url
    )
}

pub const FEATURES: &str = "• Web configuration panel\n\
    • Custom server emojis\n\
    • New-account protection\n\
    • Detailed audit logs\n\
    • Reaction verification";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_too_new_message_formats_age() {
        let text = account_too_new_message("Guild", 3.14159, 24.0);
        assert!(text.contains("3.1 hours"));
        assert!(text.contains("**24 hours**"));
        assert!(text.contains("**Guild**"));
    }

    #[test]
    fn test_kick_reason() {
        assert_eq!(kick_reason(24.0), "Account too new (<24h) - Reactgate");
        assert_eq!(kick_reason(1.5), "Account too new (<1.5h) - Reactgate");
    }
}
