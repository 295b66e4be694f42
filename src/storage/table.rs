//! Keyed record tables
//!
//! A [`Table`] is an ordered map from store-assigned ids to records plus the
//! auto-increment counter. The [`Record`] trait ties each model type to its
//! table inside a [`Dataset`].

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::error::EngineFailure;
use crate::models::{
    Account, AccountPatch, Budget, BudgetPatch, Category, CategoryPatch, NewAccount, NewBudget,
    NewCategory, RecordId,
};
use crate::models::advance_timestamp;

use super::{Dataset, TableName};

/// A model type that lives in one of the store's tables
pub trait Record: Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned {
    const TABLE: TableName;

    /// Caller-supplied fields for an insert
    type New;

    /// Partial update
    type Patch;

    fn id(&self) -> RecordId;
    fn updated_at(&self) -> DateTime<Utc>;

    /// Build a row from its store-assigned id and insertion time
    fn create(id: RecordId, new: Self::New, now: DateTime<Utc>) -> Self;

    /// Apply a partial update; must advance `updated_at`
    fn patch(&mut self, patch: Self::Patch);

    /// Advance `updated_at` after an in-place rewrite
    fn touch(&mut self);

    fn table(data: &Dataset) -> &Table<Self>;
    fn table_mut(data: &mut Dataset) -> &mut Table<Self>;
}

macro_rules! impl_record {
    ($model:ty, $new:ty, $patch:ty, $table:ident, $field:ident) => {
        impl Record for $model {
            const TABLE: TableName = TableName::$table;
            type New = $new;
            type Patch = $patch;

            fn id(&self) -> RecordId {
                self.id
            }

            fn updated_at(&self) -> DateTime<Utc> {
                self.updated_at
            }

            fn create(id: RecordId, new: Self::New, now: DateTime<Utc>) -> Self {
                <$model>::from_new(id, new, now)
            }

            fn patch(&mut self, patch: Self::Patch) {
                self.apply_patch(patch)
            }

            fn touch(&mut self) {
                self.updated_at = advance_timestamp(self.updated_at);
            }

            fn table(data: &Dataset) -> &Table<Self> {
                &data.$field
            }

            fn table_mut(data: &mut Dataset) -> &mut Table<Self> {
                &mut data.$field
            }
        }
    };
}

impl_record!(Account, NewAccount, AccountPatch, Accounts, accounts);
impl_record!(Category, NewCategory, CategoryPatch, Categories, categories);
impl_record!(Budget, NewBudget, BudgetPatch, Budgets, budgets);

/// Rows of one table keyed by id
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table<T> {
    next_id: RecordId,
    rows: BTreeMap<RecordId, T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }
}

impl<T: Record> Table<T> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.rows.values()
    }

    pub fn get_all(&self) -> Vec<T> {
        self.rows.values().cloned().collect()
    }

    pub fn get(&self, id: RecordId) -> Option<&T> {
        self.rows.get(&id)
    }

    /// Insert a new row, assigning the next id and both timestamps
    pub fn add(&mut self, new: T::New) -> RecordId {
        let id = self.next_id;
        self.next_id += 1;
        self.rows.insert(id, T::create(id, new, Utc::now()));
        id
    }

    /// Apply a partial update. Returns false if no row has this id.
    pub fn update(&mut self, id: RecordId, patch: T::Patch) -> bool {
        match self.rows.get_mut(&id) {
            Some(row) => {
                row.patch(patch);
                true
            }
            None => false,
        }
    }

    /// Insert or replace a row verbatim, timestamps included
    pub fn put(&mut self, record: T) {
        let id = record.id();
        self.bump_counter(id);
        self.rows.insert(id, record);
    }

    pub fn delete(&mut self, id: RecordId) -> bool {
        self.rows.remove(&id).is_some()
    }

    pub fn bulk_delete(&mut self, ids: &[RecordId]) -> usize {
        ids.iter().filter(|id| self.rows.remove(id).is_some()).count()
    }

    /// Remove every row. The id counter keeps counting.
    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Insert rows that already carry ids and timestamps.
    ///
    /// Fails without inserting anything if any id is already taken or
    /// repeated within the batch.
    pub fn bulk_add(&mut self, records: Vec<T>) -> Result<Vec<RecordId>, EngineFailure> {
        let mut seen = HashSet::with_capacity(records.len());
        for record in &records {
            let id = record.id();
            if id == 0 {
                return Err(EngineFailure::Constraint(format!(
                    "{}: id 0 is not a valid key",
                    T::TABLE
                )));
            }
            if self.rows.contains_key(&id) || !seen.insert(id) {
                return Err(EngineFailure::Constraint(format!(
                    "{}: key {} already exists",
                    T::TABLE,
                    id
                )));
            }
        }

        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            ids.push(record.id());
            self.put(record);
        }
        Ok(ids)
    }

    fn bump_counter(&mut self, id: RecordId) {
        if id >= self.next_id {
            self.next_id = id + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntryKind;

    fn new_category(name: &str) -> NewCategory {
        NewCategory::new(name, EntryKind::Expense, "*")
    }

    #[test]
    fn test_add_assigns_increasing_ids() {
        let mut table: Table<Category> = Table::default();
        assert_eq!(table.add(new_category("Rent")), 1);
        assert_eq!(table.add(new_category("Food")), 2);
        assert_eq!(table.len(), 2);

        let row = table.get(1).unwrap();
        assert_eq!(row.name, "Rent");
        assert_eq!(row.created_at, row.updated_at);
    }

    #[test]
    fn test_update_missing_row() {
        let mut table: Table<Category> = Table::default();
        assert!(!table.update(3, CategoryPatch::default()));
    }

    #[test]
    fn test_clear_keeps_counter() {
        let mut table: Table<Category> = Table::default();
        table.add(new_category("Rent"));
        table.clear();
        assert!(table.is_empty());
        assert_eq!(table.add(new_category("Food")), 2);
    }

    #[test]
    fn test_bulk_add_keeps_ids_and_advances_counter() {
        let mut source: Table<Category> = Table::default();
        for name in ["a", "b", "c"] {
            source.add(new_category(name));
        }
        let mut rows = source.get_all();
        rows.remove(1);

        let mut target: Table<Category> = Table::default();
        let ids = target.bulk_add(rows.clone()).unwrap();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(target.get_all(), rows);
        assert_eq!(target.add(new_category("d")), 4);
    }

    #[test]
    fn test_bulk_add_rejects_duplicates_atomically() {
        let mut table: Table<Category> = Table::default();
        table.add(new_category("Rent"));
        let existing = table.get(1).cloned().unwrap();

        let mut fresh = existing.clone();
        fresh.id = 2;

        let err = table.bulk_add(vec![fresh, existing]).unwrap_err();
        assert!(matches!(err, EngineFailure::Constraint(_)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_bulk_delete() {
        let mut table: Table<Category> = Table::default();
        for name in ["a", "b", "c"] {
            table.add(new_category(name));
        }
        assert_eq!(table.bulk_delete(&[1, 3, 9]), 2);
        assert_eq!(table.len(), 1);
    }
}
