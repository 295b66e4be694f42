//! pocket-ledger - personal-finance ledger with verified backups
//!
//! This library holds a small ledger of income and expense entries,
//! categories and budgets, and moves it in and out of portable backup
//! payloads. Payloads carry a content checksum and are either plain JSON or
//! gzip-compressed and base64-encoded; incremental payloads carry only the
//! rows changed since the previous export.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Error taxonomy and classification of raw storage failures
//! - `models`: Entries, categories and budgets
//! - `validation`: Field and batch validation
//! - `storage`: Transactional record store and key-value state
//! - `migrations`: Versioned schema upgrades
//! - `backup`: Export, verification and import of backup payloads
//! - `retry`: Bounded retry with linear backoff
//! - `performance`: Sampled operation timing
//! - `services`: CRUD and list queries
//! - `cli`: Command handlers for the binary
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
//! let payload = engine.export_backup(false)?;
//! engine.import_backup(&payload)?;
//! ```

pub mod backup;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod migrations;
pub mod models;
pub mod performance;
pub mod retry;
pub mod services;
pub mod storage;
pub mod validation;

pub use error::{LedgerError, LedgerResult};
