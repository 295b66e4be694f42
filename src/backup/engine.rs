//! Backup engine
//!
//! Export reads all three tables in one read transaction, stamps metadata
//! and a checksum, then encodes the result. Incremental exports diff the
//! current state against the last-backup reference held in the key-value
//! store and keep only rows that are new or whose `updatedAt` moved.
//!
//! Import verifies the whole payload before touching the store, then
//! replaces every table inside a single read-write transaction.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::checksum::{checksum_collections, checksum_raw_payload};
use super::codec;
use super::format::{BackupData, BackupMetadata, CompressionType, RestoreSummary, LAST_BACKUP_KEY};
use crate::config::Settings;
use crate::error::{ImportFailure, LedgerError, LedgerResult};
use crate::migrations::{MigrationRegistry, CURRENT_SCHEMA_VERSION};
use crate::models::{Account, Budget, Category, RecordId};
use crate::performance::{batch_operation, tracked, OperationType, PerformanceMonitor, QueryDetails};
use crate::retry::{with_transaction_retry, RetryOptions};
use crate::storage::{KeyValueStore, Record, RecordStore, Transaction, ALL_TABLES};
use crate::validation::{
    validate_accounts, validate_budgets, validate_categories, ValidationIssue, ValidationResult,
};

/// Tunables for export and import
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackupOptions {
    pub compression: CompressionType,
    /// Rows per delete/insert batch during restore
    pub batch_size: usize,
    /// Retry policy for the restore transaction
    pub retry: RetryOptions,
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self {
            compression: CompressionType::Gzip,
            batch_size: 100,
            retry: RetryOptions::default(),
        }
    }
}

impl BackupOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            compression: settings.backup.compression,
            batch_size: settings.backup.batch_size.max(1),
            retry: settings.retry.to_options(),
        }
    }
}

/// Current rows of every table plus the store's schema version
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub schema_version: u32,
    pub accounts: Vec<Account>,
    pub categories: Vec<Category>,
    pub budgets: Vec<Budget>,
}

/// An incremental backup and the full reference to diff the next one against
#[derive(Debug, Clone, PartialEq)]
pub struct IncrementalBackup {
    /// The changed rows only
    pub backup: BackupData,
    /// Full state at export time, carrying the same version
    pub reference: BackupData,
}

/// Rows of `current` that are absent from `previous` or whose `updated_at`
/// differs from the previous row with the same id
pub fn changed_records<T: Record>(current: &[T], previous: &[T]) -> Vec<T> {
    let seen: HashMap<RecordId, DateTime<Utc>> =
        previous.iter().map(|r| (r.id(), r.updated_at())).collect();
    current
        .iter()
        .filter(|r| seen.get(&r.id()) != Some(&r.updated_at()))
        .cloned()
        .collect()
}

pub struct BackupEngine<'a, S, K: ?Sized> {
    store: &'a S,
    kv: &'a K,
    migrations: &'a MigrationRegistry,
    options: BackupOptions,
    monitor: Option<&'a PerformanceMonitor>,
}

impl<'a, S, K> BackupEngine<'a, S, K>
where
    S: RecordStore,
    K: KeyValueStore + ?Sized,
{
    pub fn new(store: &'a S, kv: &'a K, migrations: &'a MigrationRegistry) -> Self {
        Self {
            store,
            kv,
            migrations,
            options: BackupOptions::default(),
            monitor: None,
        }
    }

    pub fn with_options(mut self, options: BackupOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_monitor(mut self, monitor: &'a PerformanceMonitor) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn options(&self) -> &BackupOptions {
        &self.options
    }

    /// Read every table in one read-only transaction
    pub fn snapshot(&self) -> LedgerResult<Snapshot> {
        let monitor = self.monitor;
        self.store.read(&ALL_TABLES, |tx| {
            Ok(Snapshot {
                schema_version: tx.schema_version(),
                accounts: read_table::<Account>(monitor, tx)?,
                categories: read_table::<Category>(monitor, tx)?,
                budgets: read_table::<Budget>(monitor, tx)?,
            })
        })
    }

    fn metadata(&self, version: u32, checksum: String, schema_version: u32) -> BackupMetadata {
        BackupMetadata {
            version,
            timestamp: Utc::now(),
            checksum,
            compression_type: self.options.compression,
            schema_version,
        }
    }

    fn full_from_snapshot(&self, snapshot: Snapshot, version: u32) -> LedgerResult<BackupData> {
        let checksum =
            checksum_collections(&snapshot.accounts, &snapshot.categories, &snapshot.budgets)?;
        Ok(BackupData {
            metadata: self.metadata(version, checksum, snapshot.schema_version),
            accounts: snapshot.accounts,
            categories: snapshot.categories,
            budgets: snapshot.budgets,
        })
    }

    /// Full backup of the current store, version 1
    pub fn create_full_backup(&self) -> LedgerResult<BackupData> {
        self.full_from_snapshot(self.snapshot()?, 1)
    }

    /// Diff the current store against `previous`.
    ///
    /// Without a previous reference this is a full backup at version 1.
    pub fn create_incremental_backup(
        &self,
        previous: Option<&BackupData>,
    ) -> LedgerResult<IncrementalBackup> {
        let snapshot = self.snapshot()?;

        let Some(previous) = previous else {
            let full = self.full_from_snapshot(snapshot, 1)?;
            return Ok(IncrementalBackup {
                backup: full.clone(),
                reference: full,
            });
        };

        let version = previous.metadata.version.saturating_add(1);
        let accounts = changed_records(&snapshot.accounts, &previous.accounts);
        let categories = changed_records(&snapshot.categories, &previous.categories);
        let budgets = changed_records(&snapshot.budgets, &previous.budgets);
        debug!(
            accounts = accounts.len(),
            categories = categories.len(),
            budgets = budgets.len(),
            "Computed incremental changes"
        );

        let checksum = checksum_collections(&accounts, &categories, &budgets)?;
        let backup = BackupData {
            metadata: self.metadata(version, checksum, snapshot.schema_version),
            accounts,
            categories,
            budgets,
        };
        let reference = self.full_from_snapshot(snapshot, version)?;

        Ok(IncrementalBackup { backup, reference })
    }

    /// The stored last-backup reference, if any
    pub fn load_last_backup(&self) -> LedgerResult<Option<BackupData>> {
        let Some(raw) = self.kv.get(LAST_BACKUP_KEY)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw).map(Some).map_err(|e| {
            LedgerError::Export(format!("Stored last-backup reference is unreadable: {}", e))
        })
    }

    /// Produce an encoded backup.
    ///
    /// Incremental exports update the last-backup reference, and only once
    /// the payload has been fully produced.
    pub fn export_backup(&self, incremental: bool) -> LedgerResult<String> {
        let (backup, reference) = if incremental {
            let previous = self.load_last_backup()?;
            let inc = self.create_incremental_backup(previous.as_ref())?;
            (inc.backup, Some(inc.reference))
        } else {
            (self.create_full_backup()?, None)
        };

        let json = serde_json::to_string(&backup)
            .map_err(|e| LedgerError::Export(format!("Failed to serialize backup: {}", e)))?;
        let payload = codec::encode(&json, self.options.compression)?;

        if let Some(reference) = reference {
            let reference_json = serde_json::to_string(&reference).map_err(|e| {
                LedgerError::Export(format!("Failed to serialize backup reference: {}", e))
            })?;
            self.kv.set(LAST_BACKUP_KEY, &reference_json)?;
        }

        info!(
            version = backup.metadata.version,
            records = backup.record_count(),
            compression = %self.options.compression,
            "Backup exported"
        );
        Ok(payload)
    }

    /// Decode and check a payload without touching the store.
    ///
    /// Checks, in order: the payload parses, metadata with a non-empty
    /// checksum is present, the checksum matches the collections, the
    /// schema version is supported, and every row passes validation.
    pub fn verify_backup(&self, payload: &str) -> LedgerResult<BackupData> {
        verify_payload(payload)
    }

    /// Replace the store's content with the payload's.
    ///
    /// Nothing is written unless verification passes. The replacement runs
    /// in one read-write transaction retried on transaction aborts.
    pub fn import_backup(&self, payload: &str) -> LedgerResult<RestoreSummary> {
        let backup = self.verify_backup(payload)?;

        if backup.metadata.is_incremental() {
            warn!(
                version = backup.metadata.version,
                records = backup.record_count(),
                "Importing an incremental backup replaces the whole store with its changed rows only"
            );
        }

        let migrations_applied =
            with_transaction_retry(self.options.retry, || self.restore(&backup))?;

        let summary = RestoreSummary {
            backup_version: backup.metadata.version,
            backup_timestamp: backup.metadata.timestamp,
            accounts: backup.accounts.len(),
            categories: backup.categories.len(),
            budgets: backup.budgets.len(),
            migrations_applied,
        };
        info!("{}", summary.summary());
        Ok(summary)
    }

    fn restore(&self, backup: &BackupData) -> LedgerResult<Vec<u32>> {
        let batch_size = self.options.batch_size;
        let monitor = self.monitor;
        self.store.write(&ALL_TABLES, |tx| {
            replace_table(tx, &backup.accounts, batch_size, monitor)?;
            replace_table(tx, &backup.categories, batch_size, monitor)?;
            replace_table(tx, &backup.budgets, batch_size, monitor)?;

            let from = backup.metadata.schema_version;
            let applied = self.migrations.migrate(from, CURRENT_SCHEMA_VERSION, tx)?;
            tx.set_schema_version(CURRENT_SCHEMA_VERSION)?;
            Ok(applied)
        })
    }
}

fn read_table<T: Record>(
    monitor: Option<&PerformanceMonitor>,
    tx: &Transaction<'_>,
) -> LedgerResult<Vec<T>> {
    tracked(monitor, OperationType::Read, T::TABLE, None, || tx.get_all::<T>())
}

/// Delete every row of `T` and insert `rows`, both in batches
fn replace_table<T: Record>(
    tx: &mut Transaction<'_>,
    rows: &[T],
    batch_size: usize,
    monitor: Option<&PerformanceMonitor>,
) -> LedgerResult<()> {
    let existing: Vec<RecordId> = tx.table::<T>()?.iter().map(|row| row.id()).collect();
    batch_operation(&existing, batch_size, |ids| {
        tx.bulk_delete::<T>(ids)?;
        Ok(Vec::<()>::new())
    })?;

    tracked(
        monitor,
        OperationType::Write,
        T::TABLE,
        Some(QueryDetails::limit(rows.len())),
        || {
            batch_operation(rows, batch_size, |chunk| {
                debug!(table = %T::TABLE, rows = chunk.len(), "Restoring batch");
                tx.bulk_add(chunk.to_vec())
            })
        },
    )?;
    Ok(())
}

/// Prefix batch-validation issue paths with the collection name
fn collect_issues(collection: &str, result: ValidationResult, into: &mut Vec<ValidationIssue>) {
    if let Err(issues) = result {
        into.extend(issues.into_vec().into_iter().map(|issue| ValidationIssue {
            path: format!("{}{}", collection, issue.path),
            message: issue.message,
        }));
    }
}

/// Standalone verification used by [`BackupEngine::verify_backup`]
pub fn verify_payload(payload: &str) -> LedgerResult<BackupData> {
    let json = codec::decode(payload)?;
    let raw: Value = serde_json::from_str(&json)
        .map_err(|e| ImportFailure::Malformed(format!("invalid JSON: {}", e)))?;
    if !raw.is_object() {
        return Err(ImportFailure::Malformed("payload is not a JSON object".into()).into());
    }

    let metadata = match raw.get("metadata") {
        Some(m) if m.is_object() => m,
        _ => return Err(ImportFailure::MissingMetadata.into()),
    };
    let expected = match metadata.get("checksum").and_then(Value::as_str) {
        Some(c) if !c.is_empty() => c.to_string(),
        _ => return Err(ImportFailure::MissingChecksum.into()),
    };

    let actual = checksum_raw_payload(&raw);
    if actual != expected {
        return Err(ImportFailure::ChecksumMismatch { expected, actual }.into());
    }

    let backup: BackupData = serde_json::from_value(raw)
        .map_err(|e| ImportFailure::Malformed(format!("unexpected payload shape: {}", e)))?;

    if backup.metadata.schema_version > CURRENT_SCHEMA_VERSION {
        return Err(ImportFailure::UnsupportedSchema {
            found: backup.metadata.schema_version,
            supported: CURRENT_SCHEMA_VERSION,
        }
        .into());
    }

    let mut issues = Vec::new();
    collect_issues("accounts", validate_accounts(&backup.accounts), &mut issues);
    collect_issues("categories", validate_categories(&backup.categories), &mut issues);
    collect_issues("budgets", validate_budgets(&backup.budgets), &mut issues);
    if !issues.is_empty() {
        return Err(ImportFailure::Invalid { issues }.into());
    }

    Ok(backup)
}
