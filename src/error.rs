use axum::http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    // Configuration errors
    #[error("Failed to load config file '{path}': {source}")]
    ConfigLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to save config to '{path}': {source}")]
    ConfigSave {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // Request errors
    #[error("{message}")]
    Validation { message: String },

    // Discord errors
    #[error("Missing permissions: {message}")]
    PermissionDenied { message: String },

    #[error("Discord API error: {message}")]
    Discord { message: String },

    #[error("Guild not found: {id}")]
    GuildNotFound { id: String },

    #[error("Channel not found: {id}")]
    ChannelNotFound { id: String },

    #[error("Role not found: {id}")]
    RoleNotFound { id: String },

    #[error("Emoji not found: {id}")]
    EmojiNotFound { id: String },

    // Bridge errors
    #[error("Gateway did not finish within {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Gateway is not running")]
    GatewayUnavailable,

    // Generic errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl BotError {
    pub fn validation(message: impl Into<String>) -> Self {
        BotError::Validation {
            message: message.into(),
        }
    }

    /// HTTP status used when this error reaches the admin API.
    pub fn status_code(&self) -> StatusCode {
        match self {
            BotError::Validation { .. } => StatusCode::BAD_REQUEST,
            BotError::GuildNotFound { .. }
            | BotError::ChannelNotFound { .. }
            | BotError::RoleNotFound { .. }
            | BotError::EmojiNotFound { .. } => StatusCode::NOT_FOUND,
            BotError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            BotError::GatewayUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<serenity::Error> for BotError {
    fn from(err: serenity::Error) -> Self {
        if let serenity::Error::Http(serenity::http::HttpError::UnsuccessfulRequest(response)) =
            &err
        {
            if response.status_code.as_u16() == 403 {
                return BotError::PermissionDenied {
                    message: response.error.message.clone(),
                };
            }
        }
        BotError::Discord {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for BotError {
    fn from(err: serde_json::Error) -> Self {
        BotError::Internal {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            BotError::validation("bad id").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            BotError::GuildNotFound { id: "1".into() }.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            BotError::Timeout { seconds: 10 }.status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            BotError::GatewayUnavailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            BotError::Discord {
                message: "boom".into()
            }
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_validation_message_is_verbatim() {
        let err = BotError::validation("Configure the role and channel first");
        assert_eq!(err.to_string(), "Configure the role and channel first");
    }
}
