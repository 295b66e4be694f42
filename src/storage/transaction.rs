//! Transaction context handed to store callbacks and migration steps

use crate::error::{EngineFailure, LedgerError, LedgerResult};
use crate::models::RecordId;

use super::table::{Record, Table};
use super::{Dataset, TableName, TransactionMode};

/// Access to the tables a transaction was opened over.
///
/// Touching a table outside the declared scope fails with
/// [`EngineFailure::OutOfScope`]; writes in a read-only transaction fail
/// with [`EngineFailure::ReadOnly`].
pub struct Transaction<'a> {
    data: &'a mut Dataset,
    mode: TransactionMode,
    scope: &'a [TableName],
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(data: &'a mut Dataset, mode: TransactionMode, scope: &'a [TableName]) -> Self {
        Self { data, mode, scope }
    }

    pub fn mode(&self) -> TransactionMode {
        self.mode
    }

    pub fn schema_version(&self) -> u32 {
        self.data.schema_version
    }

    pub fn set_schema_version(&mut self, version: u32) -> LedgerResult<()> {
        self.ensure_writable("schema version")?;
        self.data.schema_version = version;
        Ok(())
    }

    fn ensure_in_scope(&self, table: TableName) -> LedgerResult<()> {
        if self.scope.contains(&table) {
            Ok(())
        } else {
            Err(EngineFailure::OutOfScope(table).into())
        }
    }

    fn ensure_writable(&self, what: &str) -> LedgerResult<()> {
        match self.mode {
            TransactionMode::ReadWrite => Ok(()),
            TransactionMode::ReadOnly => Err(EngineFailure::ReadOnly(what.to_string()).into()),
        }
    }

    /// Read access to a table
    pub fn table<T: Record>(&self) -> LedgerResult<&Table<T>> {
        self.ensure_in_scope(T::TABLE)?;
        Ok(T::table(self.data))
    }

    /// Write access to a table
    pub fn table_mut<T: Record>(&mut self) -> LedgerResult<&mut Table<T>> {
        self.ensure_in_scope(T::TABLE)?;
        self.ensure_writable(T::TABLE.as_str())?;
        Ok(T::table_mut(self.data))
    }

    pub fn get_all<T: Record>(&self) -> LedgerResult<Vec<T>> {
        Ok(self.table::<T>()?.get_all())
    }

    pub fn get<T: Record>(&self, id: RecordId) -> LedgerResult<Option<T>> {
        Ok(self.table::<T>()?.get(id).cloned())
    }

    pub fn count<T: Record>(&self) -> LedgerResult<usize> {
        Ok(self.table::<T>()?.len())
    }

    pub fn add<T: Record>(&mut self, new: T::New) -> LedgerResult<RecordId> {
        Ok(self.table_mut::<T>()?.add(new))
    }

    pub fn update<T: Record>(&mut self, id: RecordId, patch: T::Patch) -> LedgerResult<bool> {
        Ok(self.table_mut::<T>()?.update(id, patch))
    }

    pub fn put<T: Record>(&mut self, record: T) -> LedgerResult<()> {
        self.table_mut::<T>()?.put(record);
        Ok(())
    }

    pub fn delete<T: Record>(&mut self, id: RecordId) -> LedgerResult<bool> {
        Ok(self.table_mut::<T>()?.delete(id))
    }

    pub fn bulk_delete<T: Record>(&mut self, ids: &[RecordId]) -> LedgerResult<usize> {
        Ok(self.table_mut::<T>()?.bulk_delete(ids))
    }

    pub fn clear<T: Record>(&mut self) -> LedgerResult<()> {
        self.table_mut::<T>()?.clear();
        Ok(())
    }

    pub fn bulk_add<T: Record>(&mut self, records: Vec<T>) -> LedgerResult<Vec<RecordId>> {
        self.table_mut::<T>()?
            .bulk_add(records)
            .map_err(LedgerError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, EntryKind, NewCategory};

    #[test]
    fn test_read_only_rejects_writes() {
        let mut data = Dataset::default();
        let scope = [TableName::Categories];
        let mut tx = Transaction::new(&mut data, TransactionMode::ReadOnly, &scope);

        assert!(tx.get_all::<Category>().unwrap().is_empty());
        let err = tx
            .add::<Category>(NewCategory::new("Rent", EntryKind::Expense, "*"))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Engine(EngineFailure::ReadOnly(_))));
        assert!(tx.set_schema_version(9).is_err());
    }

    #[test]
    fn test_out_of_scope_table() {
        let mut data = Dataset::default();
        let scope = [TableName::Accounts];
        let tx = Transaction::new(&mut data, TransactionMode::ReadWrite, &scope);

        let err = tx.get_all::<Category>().unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Engine(EngineFailure::OutOfScope(TableName::Categories))
        ));
    }

    #[test]
    fn test_read_write_operations() {
        let mut data = Dataset::default();
        let scope = [TableName::Categories];
        let mut tx = Transaction::new(&mut data, TransactionMode::ReadWrite, &scope);

        let id = tx
            .add::<Category>(NewCategory::new("Rent", EntryKind::Expense, "*"))
            .unwrap();
        assert_eq!(tx.count::<Category>().unwrap(), 1);
        assert!(tx.delete::<Category>(id).unwrap());
        assert!(tx.get::<Category>(id).unwrap().is_none());
    }
}
