//! In-memory record store

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use crate::error::{EngineFailure, LedgerResult};

use super::transaction::Transaction;
use super::{Dataset, RecordStore, TableName, TransactionMode};

/// A record store that lives entirely in memory.
///
/// Read-write transactions work on a copy of the dataset that replaces the
/// live one only when the callback succeeds.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<Dataset>,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dataset(data: Dataset) -> Self {
        Self {
            data: RwLock::new(data),
            closed: AtomicBool::new(false),
        }
    }

    /// Refuse every further transaction
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Copy of the committed dataset
    pub fn snapshot(&self) -> LedgerResult<Dataset> {
        self.ensure_open()?;
        let guard = self.data.read().map_err(|e| {
            EngineFailure::InvalidState(format!("Failed to acquire read lock: {}", e))
        })?;
        Ok(guard.clone())
    }

    fn ensure_open(&self) -> LedgerResult<()> {
        if self.is_closed() {
            Err(EngineFailure::InvalidState("database is closed".into()).into())
        } else {
            Ok(())
        }
    }

    /// Run a transaction, calling `commit` with the new dataset before it
    /// replaces the live one. A failing commit discards the changes.
    pub(crate) fn run<R, F, C>(
        &self,
        mode: TransactionMode,
        tables: &[TableName],
        f: F,
        commit: C,
    ) -> LedgerResult<R>
    where
        F: FnOnce(&mut Transaction<'_>) -> LedgerResult<R>,
        C: FnOnce(&Dataset) -> LedgerResult<()>,
    {
        self.ensure_open()?;

        // A write lock for both modes keeps transactions serialized
        let mut guard = self.data.write().map_err(|e| {
            EngineFailure::InvalidState(format!("Failed to acquire write lock: {}", e))
        })?;

        match mode {
            TransactionMode::ReadOnly => {
                let mut tx = Transaction::new(&mut guard, mode, tables);
                f(&mut tx)
            }
            TransactionMode::ReadWrite => {
                let mut working = guard.clone();
                let result = {
                    let mut tx = Transaction::new(&mut working, mode, tables);
                    f(&mut tx)?
                };
                commit(&working)?;
                *guard = working;
                Ok(result)
            }
        }
    }
}

impl RecordStore for MemoryStore {
    fn transaction<R, F>(&self, mode: TransactionMode, tables: &[TableName], f: F) -> LedgerResult<R>
    where
        F: FnOnce(&mut Transaction<'_>) -> LedgerResult<R>,
    {
        self.run(mode, tables, f, |_| Ok(()))
    }
}
