use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::document::{MergeReport, SetError, VerifyConfig};
use crate::error::{BotError, Result};

/// Process-wide owner of the configuration document and its file.
///
/// Guards are never held across an await, so both runtimes can share one
/// store: every mutation is an assign followed by a save.
pub struct ConfigStore {
    path: PathBuf,
    current: RwLock<VerifyConfig>,
    // Serialises writers of the temp file; readers never take it.
    save_lock: Mutex<()>,
}

pub type SharedConfigStore = Arc<ConfigStore>;

impl ConfigStore {
    /// Load the document from `path`, merged onto defaults.
    ///
    /// Never fails: unreadable or malformed files fall back to defaults.
    /// A missing file is created with the defaults.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let store = Self {
            current: RwLock::new(VerifyConfig::default()),
            save_lock: Mutex::new(()),
            path,
        };

        match read_document(&store.path) {
            Ok(Some(overrides)) => {
                let mut config = VerifyConfig::default();
                let report = config.merge(overrides, true);
                for (key, reason) in &report.rejected {
                    warn!("Ignoring invalid value for '{}' in {}: {}", key, store.path.display(), reason);
                }
                *store.current.write() = config;
                info!("Configuration loaded from {}", store.path.display());
            }
            Ok(None) => {
                store.persist();
                info!(
                    "Configuration file {} created with default values",
                    store.path.display()
                );
            }
            Err(e) => {
                warn!("{}; using default configuration", e);
            }
        }

        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A copy of the whole document.
    pub fn snapshot(&self) -> VerifyConfig {
        self.current.read().clone()
    }

    /// One recognised key of the current document; `None` for unknown keys.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.current.read().get(key)
    }

    /// Set one recognised key and persist. Unknown keys are ignored and
    /// reported as `Ok(false)`.
    pub fn set(&self, key: &str, value: Value) -> Result<bool> {
        let outcome = self.current.write().set(key, value);
        match outcome {
            Ok(()) => {
                self.persist();
                Ok(true)
            }
            Err(SetError::UnknownKey) => {
                warn!("Ignoring unknown config key '{}'", key);
                Ok(false)
            }
            Err(SetError::InvalidValue(reason)) => Err(BotError::Validation {
                message: format!("Invalid value for '{}': {}", key, reason),
            }),
        }
    }

    /// Merge a partial document from the panel and persist once.
    pub fn update(&self, partial: Map<String, Value>) -> MergeReport {
        let report = self.current.write().merge(partial, false);
        if !report.ignored.is_empty() {
            warn!("Ignoring unknown config keys: {:?}", report.ignored);
        }
        if !report.applied.is_empty() {
            self.persist();
        }
        report
    }

    /// Record the newly published verification message.
    pub fn set_verify_message(&self, message_id: u64) {
        if let Err(e) = self.set("verify_message_id", Value::String(message_id.to_string())) {
            error!("Failed to record verification message {}: {}", message_id, e);
        }
    }

    /// Write the document to disk, temp file then rename.
    pub fn save(&self) -> Result<()> {
        let _writer = self.save_lock.lock();
        let content = serde_json::to_string_pretty(&*self.current.read())?;
        let path = self.path.display().to_string();

        let temp_path = temp_path_for(&self.path);
        std::fs::write(&temp_path, content).map_err(|e| BotError::ConfigSave {
            path: path.clone(),
            source: e,
        })?;
        std::fs::rename(&temp_path, &self.path).map_err(|e| BotError::ConfigSave { path, source: e })
    }

    /// Save, logging instead of failing: losing the file must not stop the bot.
    fn persist(&self) {
        if let Err(e) = self.save() {
            error!("{}", e);
        }
    }
}

pub fn create_shared_config_store(path: impl Into<PathBuf>) -> SharedConfigStore {
    Arc::new(ConfigStore::load(path))
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn read_document(path: &Path) -> Result<Option<Map<String, Value>>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(BotError::ConfigLoad {
                path: path.display().to_string(),
                source: e,
            })
        }
    };

    let value: Value = serde_json::from_str(&content).map_err(|e| BotError::ConfigParse {
        path: path.display().to_string(),
        source: e,
    })?;

    match value {
        Value::Object(map) => Ok(Some(map)),
        other => Err(BotError::Validation {
            message: format!(
                "Config file '{}' must hold a JSON object, found {}",
                path.display(),
                kind_of(&other)
            ),
        }),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
