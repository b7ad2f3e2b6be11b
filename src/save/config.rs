//! Save system settings

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::types::SaveError;

/// Save system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    /// Storage key the snapshot is written under
    pub storage_key: String,
    /// Seconds between autosaves
    pub autosave_interval_secs: u64,
    /// Pretty-print snapshot JSON
    pub pretty: bool,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            storage_key: "save".to_string(),
            autosave_interval_secs: 300, // 5 minutes
            pretty: false,
        }
    }
}

impl SaveConfig {
    /// Parses settings JSON; missing fields keep their defaults
    pub fn from_json(text: &str) -> Result<Self, SaveError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SaveConfig::default();
        assert_eq!(config.storage_key, "save");
        assert_eq!(config.autosave_interval(), Duration::from_secs(300));
        assert!(!config.pretty);
    }

    #[test]
    fn test_partial_json() {
        let config = SaveConfig::from_json(r#"{"storage_key": "slot_2"}"#).unwrap();
        assert_eq!(config.storage_key, "slot_2");
        assert_eq!(config.autosave_interval_secs, 300);
    }

    #[test]
    fn test_bad_json() {
        let result = SaveConfig::from_json("{\"pretty\": 3}");
        assert!(matches!(result, Err(SaveError::SerializationError(_))));
    }
}
