//! Storage layer for pocket-ledger
//!
//! The record store holds three tables (accounts, categories, budgets)
//! behind the [`RecordStore`] trait. All access goes through a
//! [`Transaction`] scoped to a set of tables; read-write transactions are
//! all-or-nothing.
//!
//! Two stores are provided: [`MemoryStore`] for tests and embedding, and
//! [`JsonFileStore`] which persists the whole dataset atomically to a JSON
//! file. A small [`KeyValueStore`] abstraction holds auxiliary state such as
//! the last-backup reference.

pub mod file_io;
pub mod init;
pub mod json_store;
pub mod kv;
pub mod memory;
pub mod table;
pub mod transaction;

pub use file_io::{read_json, write_atomic, write_json_atomic};
pub use init::initialize_storage;
pub use json_store::JsonFileStore;
pub use kv::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use memory::MemoryStore;
pub use table::{Record, Table};
pub use transaction::Transaction;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::LedgerResult;
use crate::migrations::CURRENT_SCHEMA_VERSION;
use crate::models::{Account, Budget, Category};

/// The tables held by the record store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableName {
    Accounts,
    Categories,
    Budgets,
}

/// Every table, in export order
pub const ALL_TABLES: [TableName; 3] = [
    TableName::Accounts,
    TableName::Categories,
    TableName::Budgets,
];

impl TableName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accounts => "accounts",
            Self::Categories => "categories",
            Self::Budgets => "budgets",
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Access mode of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    ReadOnly,
    ReadWrite,
}

fn legacy_schema_version() -> u32 {
    1
}

/// The full content of a record store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    /// Schema version of the stored rows; files predating the field are v1
    #[serde(default = "legacy_schema_version")]
    pub schema_version: u32,

    #[serde(default)]
    pub accounts: Table<Account>,

    #[serde(default)]
    pub categories: Table<Category>,

    #[serde(default)]
    pub budgets: Table<Budget>,
}

impl Default for Dataset {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            accounts: Table::default(),
            categories: Table::default(),
            budgets: Table::default(),
        }
    }
}

impl Dataset {
    /// An empty dataset at an explicit schema version
    pub fn at_version(schema_version: u32) -> Self {
        Self {
            schema_version,
            ..Self::default()
        }
    }
}

/// Transactional access to the three record tables
pub trait RecordStore {
    /// Run `f` inside a transaction over `tables`.
    ///
    /// In `ReadWrite` mode the changes made by `f` become visible only if it
    /// returns `Ok`; an error discards all of them.
    fn transaction<R, F>(&self, mode: TransactionMode, tables: &[TableName], f: F) -> LedgerResult<R>
    where
        F: FnOnce(&mut Transaction<'_>) -> LedgerResult<R>;

    /// Shorthand for a read-only transaction
    fn read<R, F>(&self, tables: &[TableName], f: F) -> LedgerResult<R>
    where
        F: FnOnce(&mut Transaction<'_>) -> LedgerResult<R>,
    {
        self.transaction(TransactionMode::ReadOnly, tables, f)
    }

    /// Shorthand for a read-write transaction
    fn write<R, F>(&self, tables: &[TableName], f: F) -> LedgerResult<R>
    where
        F: FnOnce(&mut Transaction<'_>) -> LedgerResult<R>,
    {
        self.transaction(TransactionMode::ReadWrite, tables, f)
    }

    /// Schema version recorded in the store
    fn schema_version(&self) -> LedgerResult<u32> {
        self.read(&[], |tx| Ok(tx.schema_version()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_dataset_is_current() {
        let data = Dataset::default();
        assert_eq!(data.schema_version, CURRENT_SCHEMA_VERSION);
        assert!(data.accounts.is_empty());
    }

    #[test]
    fn test_legacy_file_defaults_to_version_one() {
        let data: Dataset = serde_json::from_str("{}").unwrap();
        assert_eq!(data.schema_version, 1);
        assert!(data.categories.is_empty());
    }

    #[test]
    fn test_table_name_display() {
        assert_eq!(TableName::Categories.to_string(), "categories");
        assert_eq!(ALL_TABLES.len(), 3);
    }
}
