pub mod document;
pub mod emoji;
pub mod snowflake;
pub mod store;

pub use document::VerifyConfig;
pub use emoji::{ReactionEmoji, VerificationEmoji};
pub use store::{create_shared_config_store, ConfigStore, SharedConfigStore};
