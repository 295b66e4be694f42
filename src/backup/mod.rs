//! Backup and restore for pocket-ledger
//!
//! # Architecture
//!
//! - `format`: the payload structure (`BackupData`, `BackupMetadata`)
//! - `checksum`: the order-insensitive payload digest
//! - `codec`: gzip + base64 transport encoding
//! - `engine`: `BackupEngine`, which exports full or incremental backups and
//!   verifies and restores them
//!
//! # Example
//!
//! ```rust,ignore
//! use pocket_ledger::backup::BackupEngine;
//! use pocket_ledger::migrations::MigrationRegistry;
//! use pocket_ledger::storage::{MemoryKeyValueStore, MemoryStore};
//!
//! let store = MemoryStore::new();
//! let kv = MemoryKeyValueStore::new();
//! let registry = MigrationRegistry::with_builtin();
//! let engine = BackupEngine::new(&store, &kv, &registry);
//!
//! let payload = engine.export_backup(false)?;
//! let summary = engine.import_backup(&payload)?;
//! println!("{}", summary.summary());
//! ```

pub mod checksum;
pub mod codec;
mod engine;
mod format;

pub use engine::{
    changed_records, verify_payload, BackupEngine, BackupOptions, IncrementalBackup, Snapshot,
};
pub use format::{BackupData, BackupMetadata, CompressionType, RestoreSummary, LAST_BACKUP_KEY};
