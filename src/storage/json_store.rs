//! Record store persisted to a single JSON file

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::LedgerResult;

use super::file_io::{read_json, write_json_atomic};
use super::memory::MemoryStore;
use super::transaction::Transaction;
use super::{Dataset, RecordStore, TableName, TransactionMode};

/// A [`MemoryStore`] whose committed state is mirrored to disk.
///
/// Every successful read-write transaction rewrites the file atomically
/// before the change becomes visible in memory.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl JsonFileStore {
    /// Open the store at `path`. A missing file yields an empty store at the
    /// current schema version; nothing is written until the first commit.
    pub fn open(path: impl Into<PathBuf>) -> LedgerResult<Self> {
        let path = path.into();
        let data: Dataset = read_json(&path)?;
        debug!(
            path = %path.display(),
            schema_version = data.schema_version,
            "Opened record store"
        );
        Ok(Self {
            path,
            inner: MemoryStore::with_dataset(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn close(&self) {
        self.inner.close();
    }

    pub fn snapshot(&self) -> LedgerResult<Dataset> {
        self.inner.snapshot()
    }
}

impl RecordStore for JsonFileStore {
    fn transaction<R, F>(&self, mode: TransactionMode, tables: &[TableName], f: F) -> LedgerResult<R>
    where
        F: FnOnce(&mut Transaction<'_>) -> LedgerResult<R>,
    {
        self.inner
            .run(mode, tables, f, |data| write_json_atomic(&self.path, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::models::{Category, EntryKind, NewCategory};
    use tempfile::TempDir;

    const CATS: &[TableName] = &[TableName::Categories];

    #[test]
    fn test_commit_persists_to_disk() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ledger.json");

        let store = JsonFileStore::open(&path).unwrap();
        assert!(!path.exists());
        store
            .write(CATS, |tx| {
                tx.add::<Category>(NewCategory::new("Rent", EntryKind::Expense, "*"))
            })
            .unwrap();
        assert!(path.exists());

        let reopened = JsonFileStore::open(&path).unwrap();
        let rows = reopened.read(CATS, |tx| tx.get_all::<Category>()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Rent");
    }

    #[test]
    fn test_rollback_leaves_file_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ledger.json");
        let store = JsonFileStore::open(&path).unwrap();

        let result: LedgerResult<()> = store.write(CATS, |tx| {
            tx.add::<Category>(NewCategory::new("Rent", EntryKind::Expense, "*"))?;
            Err(LedgerError::Transaction("aborted".into()))
        });
        assert!(result.is_err());
        assert!(!path.exists());
    }
}
