use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::storage::{write_json, Storage, StorageError, SETTINGS_KEY};

pub const DEFAULT_LANGUAGE: &str = "es";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub model: String,
    /// Stored in clear text, like the rest of the document.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider: String::new(),
            model: String::new(),
            api_key: String::new(),
            language: default_language(),
        }
    }
}

impl Settings {
    /// True once provider, model and API key are all present.
    pub fn is_complete(&self) -> bool {
        !self.provider.trim().is_empty()
            && !self.model.trim().is_empty()
            && !self.api_key.trim().is_empty()
    }

    /// The subset of settings a chat client depends on.
    pub fn client_key(&self) -> (&str, &str, &str) {
        (&self.provider, &self.model, &self.api_key)
    }

    /// API key with everything but the last four characters hidden.
    pub fn masked_api_key(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        if chars.is_empty() {
            return String::new();
        }
        let visible = chars.len().min(4);
        let hidden = chars.len() - visible;
        let tail: String = chars[hidden..].iter().collect();
        format!("{}{}", "*".repeat(hidden), tail)
    }
}

/// Settings singleton backed by a storage document.
pub struct SettingsStore {
    storage: Arc<dyn Storage>,
    settings: Settings,
}

impl SettingsStore {
    pub fn load(storage: Arc<dyn Storage>) -> Result<Self, StorageError> {
        let settings = match storage.get_item(SETTINGS_KEY)? {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                warn!(error = %err, "Failed to parse stored settings; using defaults");
                Settings::default()
            }),
            None => Settings::default(),
        };
        Ok(Self { storage, settings })
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    /// Replace the settings wholesale and persist them.
    pub fn update(&mut self, settings: Settings) -> Result<(), StorageError> {
        write_json(self.storage.as_ref(), SETTINGS_KEY, &settings)?;
        self.settings = settings;
        Ok(())
    }
}
