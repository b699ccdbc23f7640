//! Configuration for the contour tracker.

use crate::core::history::DEFAULT_HISTORY_CAPACITY;
use crate::error::TrackingError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default sample threshold shared by all nodes.
pub const DEFAULT_THRESHOLD: i32 = 500;
/// Default node sampling interval in milliseconds.
pub const DEFAULT_INTERVAL: u32 = 50;

const THRESHOLD_RANGE: std::ops::RangeInclusive<i64> = 1..=1000;
const INTERVAL_RANGE: std::ops::RangeInclusive<i64> = 1..=65535;

/// Check a threshold value, returning it narrowed on success.
pub fn validate_threshold(value: i64) -> Result<i32, TrackingError> {
    if THRESHOLD_RANGE.contains(&value) {
        Ok(value as i32)
    } else {
        Err(TrackingError::InvalidConfiguration {
            field: "threshold",
            value,
            expected: "1..=1000",
        })
    }
}

/// Check a sampling interval, returning it narrowed on success.
pub fn validate_interval(value: i64) -> Result<u32, TrackingError> {
    if INTERVAL_RANGE.contains(&value) {
        Ok(value as u32)
    } else {
        Err(TrackingError::InvalidConfiguration {
            field: "interval",
            value,
            expected: "1..=65535",
        })
    }
}

/// Check a history capacity; at least one snapshot must be kept.
pub fn validate_history_capacity(value: usize) -> Result<usize, TrackingError> {
    if value == 0 {
        return Err(TrackingError::InvalidConfiguration {
            field: "history_capacity",
            value: 0,
            expected: ">= 1",
        });
    }
    Ok(value)
}

/// Main configuration for the tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Sample value at which a node counts as active
    pub threshold: i32,

    /// Node sampling interval in milliseconds
    pub interval: u32,

    /// How often the tracker builds a snapshot
    #[serde(with = "duration_millis")]
    pub tick_period: Duration,

    /// Number of snapshots kept in history
    pub history_capacity: usize,

    /// Node count of the simulated grid (9 or 16)
    pub grid_nodes: usize,

    /// Directory for recordings
    pub recording_dir: PathBuf,

    /// Directory for stats and other state
    pub data_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("contour-tracking");

        Self {
            threshold: DEFAULT_THRESHOLD,
            interval: DEFAULT_INTERVAL,
            tick_period: Duration::from_millis(1000),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            grid_nodes: 9,
            recording_dir: data_dir.join("recordings"),
            data_path: data_dir,
        }
    }
}

impl Config {
    /// Load configuration from the default location, or defaults if absent.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::Parse(e.to_string()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.validate()?;
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    /// Path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("contour-tracking")
            .join("config.json")
    }

    /// Reject values the tracker cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_threshold(self.threshold as i64)?;
        validate_interval(self.interval as i64)?;
        validate_history_capacity(self.history_capacity)?;
        if self.grid_nodes != 9 && self.grid_nodes != 16 {
            return Err(TrackingError::InvalidConfiguration {
                field: "grid_nodes",
                value: self.grid_nodes as i64,
                expected: "9 or 16",
            }
            .into());
        }
        if self.tick_period.is_zero() {
            return Err(TrackingError::InvalidConfiguration {
                field: "tick_period",
                value: 0,
                expected: "> 0 ms",
            }
            .into());
        }
        Ok(())
    }

    /// Change the threshold, keeping the old value if the new one is invalid.
    pub fn set_threshold(&mut self, value: i64) -> Result<(), TrackingError> {
        self.threshold = validate_threshold(value)?;
        Ok(())
    }

    /// Change the interval, keeping the old value if the new one is invalid.
    pub fn set_interval(&mut self, value: i64) -> Result<(), TrackingError> {
        self.interval = validate_interval(value)?;
        Ok(())
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.recording_dir)?;
        std::fs::create_dir_all(&self.data_path)?;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Serialize error: {0}")]
    Serialize(String),
    #[error(transparent)]
    Invalid(#[from] TrackingError),
}

/// Serde support for Duration as whole milliseconds.
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.threshold, 500);
        assert_eq!(config.interval, 50);
        assert_eq!(config.history_capacity, 10);
        assert_eq!(config.tick_period, Duration::from_millis(1000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_threshold_range() {
        assert_eq!(validate_threshold(1).ok(), Some(1));
        assert_eq!(validate_threshold(1000).ok(), Some(1000));
        assert!(validate_threshold(0).is_err());
        assert!(validate_threshold(1001).is_err());
    }

    #[test]
    fn test_rejected_value_keeps_previous() {
        let mut config = Config::default();
        assert!(config.set_threshold(5000).is_err());
        assert_eq!(config.threshold, 500);
        assert!(config.set_interval(0).is_err());
        assert_eq!(config.interval, 50);
        config.set_interval(65535).unwrap();
        assert_eq!(config.interval, 65535);
    }

    #[test]
    fn test_grid_size_must_be_supported() {
        let config = Config {
            grid_nodes: 12,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_json_uses_millis() {
        let config = Config {
            tick_period: Duration::from_millis(500),
            ..Config::default()
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["tick_period"], 500);
        let back: Config = serde_json::from_value(json).unwrap();
        assert_eq!(back.tick_period, Duration::from_millis(500));
    }
}
