use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::emoji::VerificationEmoji;
use super::snowflake;

/// Keys of the persisted document, in file order.
pub const KNOWN_KEYS: [&str; 13] = [
    "title",
    "description",
    "image_url",
    "color",
    "emoji",
    "verify_role_id",
    "verify_channel_id",
    "verify_message_id",
    "log_channel_id",
    "min_account_age_hours",
    "use_server_emoji",
    "server_emoji_name",
    "server_emoji_id",
];

/// The verification configuration, one document for every guild the bot is in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    /// Embed title of the verification message
    pub title: String,
    /// Embed description of the verification message
    pub description: String,
    /// Optional embed image; empty means none
    pub image_url: String,
    #[serde(with = "snowflake::colour")]
    pub color: u32,
    /// Unicode emoji used when `use_server_emoji` is off
    pub emoji: String,
    #[serde(with = "snowflake")]
    pub verify_role_id: Option<u64>,
    #[serde(with = "snowflake")]
    pub verify_channel_id: Option<u64>,
    /// The currently published verification message
    #[serde(with = "snowflake")]
    pub verify_message_id: Option<u64>,
    #[serde(with = "snowflake")]
    pub log_channel_id: Option<u64>,
    /// Accounts younger than this are removed on join
    pub min_account_age_hours: f64,
    pub use_server_emoji: bool,
    pub server_emoji_name: Option<String>,
    #[serde(with = "snowflake")]
    pub server_emoji_id: Option<u64>,

    /// Keys written by other versions, carried through saves untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            title: "Verification".to_string(),
            description: "Welcome! React with the emoji below to verify yourself and get full access to the server.".to_string(),
            image_url: String::new(),
            color: 0x5865F2,
            emoji: "✅".to_string(),
            verify_role_id: None,
            verify_channel_id: None,
            verify_message_id: None,
            log_channel_id: None,
            min_account_age_hours: 24.0,
            use_server_emoji: false,
            server_emoji_name: None,
            server_emoji_id: None,
            extra: BTreeMap::new(),
        }
    }
}

/// Why a single key could not be applied.
#[derive(Debug, Clone, PartialEq)]
pub enum SetError {
    UnknownKey,
    InvalidValue(String),
}

/// Result of merging a partial document.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct MergeReport {
    pub applied: Vec<String>,
    pub ignored: Vec<String>,
    pub rejected: BTreeMap<String, String>,
}

impl VerifyConfig {
    pub fn is_known_key(key: &str) -> bool {
        KNOWN_KEYS.contains(&key)
    }

    /// The document as a JSON object, ids as strings.
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// One known key as stored in the file, ids as strings.
    pub fn get(&self, key: &str) -> Option<Value> {
        if !Self::is_known_key(key) {
            return None;
        }
        self.to_map().remove(key)
    }

    /// Replace one known key. The document is untouched on error.
    pub fn set(&mut self, key: &str, value: Value) -> Result<(), SetError> {
        if !Self::is_known_key(key) {
            return Err(SetError::UnknownKey);
        }

        let mut map = self.to_map();
        map.insert(key.to_string(), value);
        let candidate: VerifyConfig = serde_json::from_value(Value::Object(map))
            .map_err(|e| SetError::InvalidValue(e.to_string()))?;
        candidate.validate().map_err(SetError::InvalidValue)?;

        *self = candidate;
        Ok(())
    }

    /// Apply every recognised key of `overrides`, one level deep.
    ///
    /// With `keep_unknown`, unrecognised keys are stored in `extra` (file
    /// load); otherwise they are reported as ignored (panel update).
    pub fn merge(&mut self, overrides: Map<String, Value>, keep_unknown: bool) -> MergeReport {
        let mut report = MergeReport::default();

        for (key, value) in overrides {
            match self.set(&key, value.clone()) {
                Ok(()) => report.applied.push(key),
                Err(SetError::UnknownKey) if keep_unknown => {
                    self.extra.insert(key.clone(), value);
                    report.applied.push(key);
                }
                Err(SetError::UnknownKey) => report.ignored.push(key),
                Err(SetError::InvalidValue(reason)) => {
                    report.rejected.insert(key, reason);
                }
            }
        }

        report
    }

    fn validate(&self) -> Result<(), String> {
        if !self.min_account_age_hours.is_finite() || self.min_account_age_hours < 0.0 {
            return Err(format!(
                "min_account_age_hours must be a non-negative number, got {}",
                self.min_account_age_hours
            ));
        }
        Ok(())
    }

    /// The authoritative verification emoji, if one is configured.
    pub fn verification_emoji(&self) -> Option<VerificationEmoji> {
        if self.use_server_emoji {
            if let Some(id) = self.server_emoji_id {
                return Some(VerificationEmoji::Custom {
                    id,
                    name: self.server_emoji_name.clone().unwrap_or_default(),
                });
            }
        }

        let literal = self.emoji.trim();
        if literal.is_empty() {
            None
        } else {
            Some(VerificationEmoji::Literal(literal.to_string()))
        }
    }

    pub fn image(&self) -> Option<&str> {
        let url = self.image_url.trim();
        (!url.is_empty()).then_some(url)
    }
}
