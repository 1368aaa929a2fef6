//! Save system configuration
//!
//! Everything here has a sensible default; a JSON config file only needs to
//! name the fields it wants to change.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use super::error::SaveError;
use super::types::CURRENT_SAVE_VERSION;

/// Auto-save intervals shorter than this are raised to it
pub const MIN_AUTO_SAVE_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    /// Number of manual slots, addressed 1..=manual_slots
    pub manual_slots: u8,
    /// Backend key prefix for manual slots (slot number is appended)
    pub manual_key_prefix: String,
    /// Backend key of the auto-save slot
    pub auto_key: String,
    /// Rotating backups kept for the auto-save slot
    pub backup_count: usize,

    pub auto_save_enabled: bool,
    /// Timer cadence for auto-saves
    pub auto_save_interval_secs: u64,
    /// Minimum gap between two event-triggered auto-saves
    pub event_cooldown_secs: u64,
    /// Capture a preview image for auto-saves too
    pub capture_preview_on_auto_save: bool,

    /// Version a save must carry to count as fully compatible
    pub required_version: String,
}

impl Default for SaveConfig {
    fn default() -> Self {
        SaveConfig {
            manual_slots: 3,
            manual_key_prefix: "crawler_save_slot_".to_string(),
            auto_key: "crawler_save_auto".to_string(),
            backup_count: 3,
            auto_save_enabled: true,
            auto_save_interval_secs: 300, // 5 minutes
            event_cooldown_secs: 30,
            capture_preview_on_auto_save: false,
            required_version: CURRENT_SAVE_VERSION.to_string(),
        }
    }
}

impl SaveConfig {
    /// Parses a config from JSON; missing fields keep their defaults
    pub fn from_json(text: &str) -> Result<Self, SaveError> {
        serde_json::from_str(text)
            .map_err(|e| SaveError::DeserializationError(format!("invalid save config: {}", e)))
    }

    /// Loads a config file, falling back to defaults if it can't be used
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("Using default save config ({}: {})", path.display(), e);
                return Self::default();
            }
        };

        match Self::from_json(&text) {
            Ok(config) => {
                log::info!("Loaded save config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("Using default save config: {}", e);
                Self::default()
            }
        }
    }

    /// Timer interval, never shorter than `MIN_AUTO_SAVE_INTERVAL_SECS`
    pub fn auto_save_interval(&self) -> Duration {
        Duration::from_secs(self.auto_save_interval_secs.max(MIN_AUTO_SAVE_INTERVAL_SECS))
    }

    pub fn event_cooldown(&self) -> Duration {
        Duration::from_secs(self.event_cooldown_secs)
    }

    pub fn manual_key(&self, slot: u8) -> String {
        format!("{}{}", self.manual_key_prefix, slot)
    }

    /// Key of rotation backup `index` (1 = most recent)
    pub fn backup_key(&self, index: usize) -> String {
        format!("{}_backup_{}", self.auto_key, index)
    }
}
