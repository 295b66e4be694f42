//! Ledger entry service
//!
//! Entries are the individual income and expense records stored in the
//! `accounts` table.

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Account, AccountPatch, NewAccount, RecordId};
use crate::performance::{batch_operation, tracked, OperationType, PerformanceMonitor, QueryDetails};
use crate::storage::{RecordStore, TableName};
use crate::validation::{validate_account_patch, validate_batch, validate_new_account};

use super::ensure_category;

const TABLES: &[TableName] = &[TableName::Accounts, TableName::Categories];

/// Rows inserted per batch by [`AccountService::bulk_add`]
pub const BULK_BATCH_SIZE: usize = 100;

/// Service for ledger entry management
pub struct AccountService<'a, S> {
    store: &'a S,
    monitor: Option<&'a PerformanceMonitor>,
}

impl<'a, S: RecordStore> AccountService<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            monitor: None,
        }
    }

    pub fn with_monitor(mut self, monitor: &'a PerformanceMonitor) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Record a new entry against an existing category
    pub fn create(&self, new: NewAccount) -> LedgerResult<Account> {
        validate_new_account(&new)?;

        tracked(self.monitor, OperationType::Write, TableName::Accounts, None, || {
            self.store.write(TABLES, |tx| {
                ensure_category(tx, new.category_id)?;
                let id = tx.add::<Account>(new)?;
                tx.get(id)?.ok_or_else(|| LedgerError::account_not_found(id))
            })
        })
    }

    /// Insert many entries in one transaction.
    ///
    /// Either every entry is inserted or none is.
    pub fn bulk_add(&self, entries: Vec<NewAccount>) -> LedgerResult<Vec<RecordId>> {
        validate_batch(&entries, validate_new_account)?;

        let count = entries.len();
        tracked(
            self.monitor,
            OperationType::Write,
            TableName::Accounts,
            Some(QueryDetails::limit(count)),
            || {
                self.store.write(TABLES, |tx| {
                    batch_operation(&entries, BULK_BATCH_SIZE, |chunk| {
                        chunk
                            .iter()
                            .map(|entry| {
                                ensure_category(tx, entry.category_id)?;
                                tx.add::<Account>(entry.clone())
                            })
                            .collect()
                    })
                })
            },
        )
    }

    pub fn get(&self, id: RecordId) -> LedgerResult<Option<Account>> {
        self.store.read(TABLES, |tx| tx.get(id))
    }

    /// Get an entry by ID, failing if it does not exist
    pub fn find(&self, id: RecordId) -> LedgerResult<Account> {
        self.get(id)?
            .ok_or_else(|| LedgerError::account_not_found(id))
    }

    /// Entries, optionally limited to one category, oldest first
    pub fn list(&self, category_id: Option<RecordId>) -> LedgerResult<Vec<Account>> {
        let details = QueryDetails {
            filter: category_id.map(|id| format!("categoryId={}", id)),
            sort: Some("createdAt".into()),
            limit: None,
        };
        tracked(self.monitor, OperationType::Read, TableName::Accounts, Some(details), || {
            self.store.read(TABLES, |tx| {
                let mut entries: Vec<Account> = tx
                    .table::<Account>()?
                    .iter()
                    .filter(|a| category_id.map_or(true, |id| a.category_id == id))
                    .cloned()
                    .collect();
                entries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
                Ok(entries)
            })
        })
    }

    /// Sum of entry amounts, optionally for one category
    pub fn total(&self, category_id: Option<RecordId>) -> LedgerResult<i64> {
        Ok(self.list(category_id)?.iter().map(|a| a.amount).sum())
    }

    pub fn update(&self, id: RecordId, patch: AccountPatch) -> LedgerResult<Account> {
        validate_account_patch(&patch)?;

        tracked(self.monitor, OperationType::Write, TableName::Accounts, None, || {
            self.store.write(TABLES, |tx| {
                if let Some(category_id) = patch.category_id {
                    ensure_category(tx, category_id)?;
                }
                if !tx.update::<Account>(id, patch)? {
                    return Err(LedgerError::account_not_found(id));
                }
                tx.get(id)?.ok_or_else(|| LedgerError::account_not_found(id))
            })
        })
    }

    pub fn delete(&self, id: RecordId) -> LedgerResult<Account> {
        self.store.write(TABLES, |tx| {
            let entry = tx
                .get::<Account>(id)?
                .ok_or_else(|| LedgerError::account_not_found(id))?;
            tx.delete::<Account>(id)?;
            Ok(entry)
        })
    }
}
