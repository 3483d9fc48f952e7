//! Application settings

use crate::core::record::RecordDefaults;
use crate::core::session::SessionSettings;
use crate::core::transport::SerialConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No config directory on this platform
    #[error("could not determine config directory")]
    NoConfigDir,

    /// Read/write failure
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid TOML
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Serialization failure
    #[error("could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Reader connection
    pub serial: SerialConfig,
    /// Protocol timing
    pub protocol: ProtocolConfig,
    /// Record store
    pub store: StoreConfig,
    /// Values for new records
    pub records: RecordDefaults,
    /// Log output
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load config from the default location; a missing file means defaults
    pub fn load() -> Result<Self, ConfigError> {
        let path = super::config_file().ok_or(ConfigError::NoConfigDir)?;
        Self::load_from(&path)
    }

    /// Load config from `path`; a missing file means defaults
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to `path`
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Session timing derived from the protocol section
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            write_settle: Duration::from_millis(self.protocol.write_settle_ms),
        }
    }
}

/// Protocol timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Delay between a ready signal and the payload write (ms)
    pub write_settle_ms: u64,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self { write_settle_ms: 100 }
    }
}

/// Record store settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON file holding the records
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: super::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("callsheet.json"),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Also write logs to daily files
    pub file_enabled: bool,
    /// Log file directory
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file_enabled: false,
            directory: super::log_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.session_settings().write_settle, Duration::from_millis(100));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[serial]\nport = \"COM5\"\n\n[records]\nlocation = \"stage2\"\n",
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.serial.port, "COM5");
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.records.location, "stage2");
        assert_eq!(config.records.scale, "1");
        assert_eq!(config.protocol.write_settle_ms, 100);
    }

    #[test]
    fn test_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = AppConfig::default();
        config.protocol.write_settle_ms = 250;
        config.save_to(&path).unwrap();
        assert_eq!(AppConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "serial = 5").unwrap();
        assert!(matches!(AppConfig::load_from(&path), Err(ConfigError::Parse(_))));
    }
}
