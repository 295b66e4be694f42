//! Service layer for pocket-ledger
//!
//! The service layer provides the write operations and list queries on top
//! of the record store, validating input before anything is written.
//!
//! Foreign keys are checked when a row is created or re-pointed, but
//! deleting a category leaves the entries and budgets that reference it in
//! place.

pub mod account;
pub mod budget;
pub mod category;

pub use account::AccountService;
pub use budget::BudgetService;
pub use category::CategoryService;

use tracing::info;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Account, Budget, Category, RecordId};
use crate::storage::{RecordStore, Transaction, ALL_TABLES};

/// Remove every entry, category and budget in one transaction
pub fn reset_database<S: RecordStore>(store: &S) -> LedgerResult<()> {
    store.write(&ALL_TABLES, |tx| {
        tx.clear::<Account>()?;
        tx.clear::<Category>()?;
        tx.clear::<Budget>()?;
        Ok(())
    })?;
    info!("Database reset");
    Ok(())
}

/// Fail with a not-found error unless the category exists
pub(crate) fn ensure_category(tx: &Transaction<'_>, id: RecordId) -> LedgerResult<()> {
    match tx.get::<Category>(id)? {
        Some(_) => Ok(()),
        None => Err(LedgerError::category_not_found(id)),
    }
}
