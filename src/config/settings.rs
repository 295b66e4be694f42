//! User settings for pocket-ledger
//!
//! Backup, retry and monitoring preferences plus the log level. Every field
//! has a serde default so older or hand-edited config files keep loading.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::paths::LedgerPaths;
use crate::backup::CompressionType;
use crate::error::{LedgerError, LedgerResult};
use crate::performance::MonitoringConfig;
use crate::retry::RetryOptions;
use crate::storage::write_atomic;

/// Backup export preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupSettings {
    #[serde(default)]
    pub compression: CompressionType,

    /// Records per clear/insert batch during restore
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            compression: CompressionType::default(),
            batch_size: default_batch_size(),
        }
    }
}

/// Retry policy for store operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay; attempt `n` waits `delay_ms * n`
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

impl RetrySettings {
    pub fn to_options(&self) -> RetryOptions {
        RetryOptions {
            max_attempts: self.max_attempts,
            delay: Duration::from_millis(self.delay_ms),
        }
    }
}

/// User settings for pocket-ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version of the settings file itself
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    #[serde(default)]
    pub backup: BackupSettings,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub monitoring: MonitoringConfig,

    /// Default tracing filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_schema_version() -> u32 {
    1
}

fn default_batch_size() -> usize {
    100
}

fn default_max_attempts() -> u32 {
    3
}

fn default_delay_ms() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            backup: BackupSettings::default(),
            retry: RetrySettings::default(),
            monitoring: MonitoringConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or create default settings if file doesn't exist
    pub fn load_or_create(paths: &LedgerPaths) -> LedgerResult<Self> {
        let settings_path = paths.settings_file();

        if !settings_path.exists() {
            // Not persisted until the caller saves
            return Ok(Settings::default());
        }

        let contents = std::fs::read_to_string(&settings_path)
            .map_err(|e| LedgerError::Io(format!("Failed to read settings file: {}", e)))?;

        serde_json::from_str(&contents)
            .map_err(|e| LedgerError::Config(format!("Failed to parse settings file: {}", e)))
    }

    /// Save settings to disk
    pub fn save(&self, paths: &LedgerPaths) -> LedgerResult<()> {
        paths.ensure_directories()?;

        let contents = serde_json::to_vec_pretty(self)
            .map_err(|e| LedgerError::Config(format!("Failed to serialize settings: {}", e)))?;

        write_atomic(paths.settings_file(), &contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.backup.compression, CompressionType::Gzip);
        assert_eq!(settings.backup.batch_size, 100);
        assert_eq!(settings.retry.max_attempts, 3);
        assert_eq!(settings.retry.delay_ms, 1000);
        assert!((settings.monitoring.sample_rate - 0.1).abs() < f64::EPSILON);
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());

        let mut settings = Settings::default();
        settings.backup.compression = CompressionType::None;
        settings.retry.max_attempts = 5;

        settings.save(&paths).unwrap();
        assert!(paths.is_initialized());

        let loaded = Settings::load_or_create(&paths).unwrap();
        assert_eq!(loaded.backup.compression, CompressionType::None);
        assert_eq!(loaded.retry.max_attempts, 5);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"retry": {"delay_ms": 10}}"#).unwrap();
        assert_eq!(settings.retry.delay_ms, 10);
        assert_eq!(settings.retry.max_attempts, 3);
        assert_eq!(settings.backup.batch_size, 100);

        let options = settings.retry.to_options();
        assert_eq!(options.delay, Duration::from_millis(10));
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        std::fs::write(paths.settings_file(), "{ nope").unwrap();

        let err = Settings::load_or_create(&paths).unwrap_err();
        assert!(matches!(err, LedgerError::Config(_)));
    }
}
