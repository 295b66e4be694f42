//! Backup payload format
//!
//! ```json
//! { "metadata": { "version": 1, "timestamp": "...", "checksum": "1a2b3c4d",
//!                 "compressionType": "gzip", "schemaVersion": 3 },
//!   "accounts": [...], "categories": [...], "budgets": [...] }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{Account, Budget, Category};

/// Key of the last-backup reference in the key-value store
pub const LAST_BACKUP_KEY: &str = "lastBackup";

/// How the serialized payload is encoded for transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionType {
    #[default]
    Gzip,
    None,
}

impl fmt::Display for CompressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gzip => write!(f, "gzip"),
            Self::None => write!(f, "none"),
        }
    }
}

fn legacy_schema_version() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupMetadata {
    /// 1 for a full backup, previous + 1 for each incremental one
    pub version: u32,
    pub timestamp: DateTime<Utc>,
    pub checksum: String,
    #[serde(default)]
    pub compression_type: CompressionType,
    /// Record schema the rows were written with
    #[serde(default = "legacy_schema_version")]
    pub schema_version: u32,
}

impl BackupMetadata {
    pub fn is_incremental(&self) -> bool {
        self.version > 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupData {
    pub metadata: BackupMetadata,
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub budgets: Vec<Budget>,
}

impl BackupData {
    pub fn record_count(&self) -> usize {
        self.accounts.len() + self.categories.len() + self.budgets.len()
    }
}

/// Outcome of a successful import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreSummary {
    pub backup_version: u32,
    pub backup_timestamp: DateTime<Utc>,
    pub accounts: usize,
    pub categories: usize,
    pub budgets: usize,
    /// Migration steps run on the restored rows
    pub migrations_applied: Vec<u32>,
}

impl RestoreSummary {
    pub fn summary(&self) -> String {
        let mut text = format!(
            "Restored {} entries, {} categories, {} budgets from backup v{} ({})",
            self.accounts,
            self.categories,
            self.budgets,
            self.backup_version,
            self.backup_timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        );
        if !self.migrations_applied.is_empty() {
            let versions: Vec<String> =
                self.migrations_applied.iter().map(|v| v.to_string()).collect();
            text.push_str(&format!("; migrated through v{}", versions.join(", v")));
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_defaults_for_old_payloads() {
        let json = r#"{"version":2,"timestamp":"2024-03-01T10:00:00Z","checksum":"abc"}"#;
        let metadata: BackupMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(metadata.schema_version, 1);
        assert_eq!(metadata.compression_type, CompressionType::Gzip);
        assert!(metadata.is_incremental());
    }

    #[test]
    fn test_metadata_uses_camel_case() {
        let metadata = BackupMetadata {
            version: 1,
            timestamp: Utc::now(),
            checksum: "00000000".into(),
            compression_type: CompressionType::None,
            schema_version: 3,
        };
        let value = serde_json::to_value(&metadata).unwrap();
        assert_eq!(value["compressionType"], "none");
        assert_eq!(value["schemaVersion"], 3);
    }

    #[test]
    fn test_summary_mentions_migrations() {
        let summary = RestoreSummary {
            backup_version: 1,
            backup_timestamp: Utc::now(),
            accounts: 2,
            categories: 1,
            budgets: 0,
            migrations_applied: vec![2, 3],
        };
        let text = summary.summary();
        assert!(text.starts_with("Restored 2 entries, 1 categories, 0 budgets"));
        assert!(text.ends_with("migrated through v2, v3"));
    }
}
