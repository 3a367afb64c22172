use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::rolling_window::{DEFAULT_SENTINEL, MIN_ITEM_LIMIT};
use crate::error::ConfigError;

/// Rows kept by a display when nothing else is configured.
pub const DEFAULT_ITEM_LIMIT: usize = 1000;

/// 1000 / 40 = 25 updates per second, smooth to the eye without flooding the display.
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 40;

/// Tuning for one progress log, loadable from a camelCase JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressConfig {
    /// Maximum number of rows in the rolling window. Values below 2 are raised to 2.
    pub item_limit: usize,
    /// Pause between two drain cycles, in milliseconds.
    pub flush_interval_ms: u64,
    /// Row text marking that older history was cut.
    pub sentinel: String,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            item_limit: DEFAULT_ITEM_LIMIT,
            flush_interval_ms: DEFAULT_FLUSH_INTERVAL_MS,
            sentinel: DEFAULT_SENTINEL.to_string(),
        }
    }
}

/// Optional values layered over a [`ProgressConfig`]; `Some` wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressOverrides {
    pub item_limit: Option<usize>,
    pub flush_interval_ms: Option<u64>,
    pub sentinel: Option<String>,
}

impl ProgressConfig {
    /// The row capacity actually used, never below [`MIN_ITEM_LIMIT`].
    pub fn effective_item_limit(&self) -> usize {
        self.item_limit.max(MIN_ITEM_LIMIT)
    }

    /// Pause between drain cycles.
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// Parses a JSON document; missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Like [`ProgressConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            log::info!("Config file not found at {}. Using defaults.", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    // Merge overrides, where 'other' overrides 'self' for Some values
    pub fn merge(self, other: ProgressOverrides) -> ProgressConfig {
        ProgressConfig {
            item_limit: other.item_limit.unwrap_or(self.item_limit),
            flush_interval_ms: other.flush_interval_ms.unwrap_or(self.flush_interval_ms),
            sentinel: other.sentinel.unwrap_or(self.sentinel),
        }
    }
}

impl fmt::Display for ProgressConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ProgressConfig
    Item limit: {} (effective {}),
    Flush interval: {} ms,
    Sentinel: {:?}
",
            self.item_limit,
            self.effective_item_limit(),
            self.flush_interval_ms,
            self.sentinel
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_display_cadence() {
        let config = ProgressConfig::default();
        assert_eq!(config.item_limit, 1000);
        assert_eq!(config.flush_interval(), Duration::from_millis(40));
        assert_eq!(config.sentinel, "...");
    }

    #[test]
    fn test_item_limit_is_clamped() {
        let config = ProgressConfig { item_limit: 1, ..Default::default() };
        assert_eq!(config.effective_item_limit(), 2);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ProgressConfig::from_json_str(r#"{ "itemLimit": 50 }"#).unwrap();
        assert_eq!(config.item_limit, 50);
        assert_eq!(config.flush_interval_ms, 40);
        assert_eq!(config.sentinel, "...");
    }

    #[test]
    fn test_invalid_json_is_reported() {
        let result = ProgressConfig::from_json_str("{ itemLimit: }");
        assert!(matches!(result, Err(ConfigError::JsonError(_))));
    }

    #[test]
    fn test_load_from_file_and_merge() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "itemLimit": 10, "flushIntervalMs": 100, "sentinel": "[..]" }}"#).unwrap();

        let loaded = ProgressConfig::load(file.path()).unwrap();
        assert_eq!(loaded.item_limit, 10);

        let merged = loaded.merge(ProgressOverrides {
            flush_interval_ms: Some(5),
            ..Default::default()
        });
        assert_eq!(merged.item_limit, 10);
        assert_eq!(merged.flush_interval_ms, 5);
        assert_eq!(merged.sentinel, "[..]");
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProgressConfig::load_or_default(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, ProgressConfig::default());
        assert!(matches!(
            ProgressConfig::load(&dir.path().join("absent.json")),
            Err(ConfigError::IoError(_))
        ));
    }
}
