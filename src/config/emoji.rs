use std::fmt;

/// The emoji whose reaction toggles the verification role.
///
/// Exactly one form is authoritative, selected by `use_server_emoji` in the
/// config document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationEmoji {
    /// A Unicode emoji such as `✅`.
    Literal(String),
    /// A custom emoji uploaded to the guild. Matched by id only.
    Custom { id: u64, name: String },
}

/// The emoji carried by a reaction notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactionEmoji {
    Unicode(String),
    Custom {
        id: u64,
        name: Option<String>,
        animated: bool,
    },
}

impl VerificationEmoji {
    pub fn matches(&self, reaction: &ReactionEmoji) -> bool {
        match (self, reaction) {
            (VerificationEmoji::Custom { id, .. }, ReactionEmoji::Custom { id: other, .. }) => {
                id == other
            }
            (VerificationEmoji::Custom { .. }, ReactionEmoji::Unicode(_)) => false,
            (VerificationEmoji::Literal(literal), ReactionEmoji::Unicode(other)) => {
                literal == other
            }
            // A literal may be pasted in mention form, e.g. `<:party:555>`.
            (VerificationEmoji::Literal(literal), custom @ ReactionEmoji::Custom { .. }) => {
                *literal == custom.to_string()
            }
        }
    }

    /// Short label used in audit entries.
    pub fn label(&self) -> &str {
        match self {
            VerificationEmoji::Literal(literal) => literal,
            VerificationEmoji::Custom { name, .. } => name,
        }
    }
}

impl fmt::Display for ReactionEmoji {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReactionEmoji::Unicode(s) => f.write_str(s),
            ReactionEmoji::Custom { id, name, animated } => write!(
                f,
                "<{}:{}:{}>",
                if *animated { "a" } else { "" },
                name.as_deref().unwrap_or(""),
                id
            ),
        }
    }
}
