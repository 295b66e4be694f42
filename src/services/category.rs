//! Category service
//!
//! CRUD and listing for categories.

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Category, CategoryPatch, EntryKind, NewCategory, RecordId};
use crate::performance::{tracked, OperationType, PerformanceMonitor, QueryDetails};
use crate::storage::{RecordStore, TableName};
use crate::validation::{validate_category_patch, validate_new_category};

const TABLES: &[TableName] = &[TableName::Categories];

/// Service for category management
pub struct CategoryService<'a, S> {
    store: &'a S,
    monitor: Option<&'a PerformanceMonitor>,
}

impl<'a, S: RecordStore> CategoryService<'a, S> {
    /// Create a new category service
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

    /// Create a new category
    pub fn create(&self, new: NewCategory) -> LedgerResult<Category> {
        validate_new_category(&new)?;

        tracked(self.monitor, OperationType::Write, TableName::Categories, None, || {
            self.store.write(TABLES, |tx| {
                let id = tx.add::<Category>(new)?;
                tx.get(id)?.ok_or_else(|| LedgerError::category_not_found(id))
            })
        })
    }

    /// Get a category by ID
    pub fn get(&self, id: RecordId) -> LedgerResult<Option<Category>> {
        self.store.read(TABLES, |tx| tx.get(id))
    }

    /// Get a category by ID, failing if it does not exist
    pub fn find(&self, id: RecordId) -> LedgerResult<Category> {
        self.get(id)?
            .ok_or_else(|| LedgerError::category_not_found(id))
    }

    /// Get a category by name (case-insensitive)
    pub fn get_by_name(&self, name: &str) -> LedgerResult<Option<Category>> {
        let name = name.trim().to_lowercase();
        self.store.read(TABLES, |tx| {
            Ok(tx
                .table::<Category>()?
                .iter()
                .find(|c| c.name.to_lowercase() == name)
                .cloned())
        })
    }

    /// Find a category by ID or name
    pub fn resolve(&self, identifier: &str) -> LedgerResult<Category> {
        if let Ok(id) = identifier.parse::<RecordId>() {
            if let Some(category) = self.get(id)? {
                return Ok(category);
            }
        }
        self.get_by_name(identifier)?
            .ok_or_else(|| LedgerError::category_not_found(identifier))
    }

    /// Categories, optionally of one type, ordered by name
    pub fn list(&self, kind: Option<EntryKind>) -> LedgerResult<Vec<Category>> {
        let details = QueryDetails {
            filter: kind.map(|k| format!("type={}", k)),
            sort: Some("name".into()),
            limit: None,
        };
        tracked(self.monitor, OperationType::Query, TableName::Categories, Some(details), || {
            self.store.read(TABLES, |tx| {
                let mut categories: Vec<Category> = tx
                    .table::<Category>()?
                    .iter()
                    .filter(|c| kind.map_or(true, |k| c.kind == k))
                    .cloned()
                    .collect();
                categories.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
                Ok(categories)
            })
        })
    }

    /// Apply a partial update
    pub fn update(&self, id: RecordId, patch: CategoryPatch) -> LedgerResult<Category> {
        validate_category_patch(&patch)?;

        tracked(self.monitor, OperationType::Write, TableName::Categories, None, || {
            self.store.write(TABLES, |tx| {
                if !tx.update::<Category>(id, patch)? {
                    return Err(LedgerError::category_not_found(id));
                }
                tx.get(id)?.ok_or_else(|| LedgerError::category_not_found(id))
            })
        })
    }

    /// Delete a category. Entries and budgets pointing at it are kept.
    pub fn delete(&self, id: RecordId) -> LedgerResult<Category> {
        self.store.write(TABLES, |tx| {
            let category = tx
                .get::<Category>(id)?
                .ok_or_else(|| LedgerError::category_not_found(id))?;
            tx.delete::<Category>(id)?;
            Ok(category)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Account, NewAccount};
    use crate::services::AccountService;
    use crate::storage::MemoryStore;

    fn new(name: &str, kind: EntryKind) -> NewCategory {
        NewCategory::new(name, kind, "*")
    }

    #[test]
    fn test_create_and_find() {
        let store = MemoryStore::new();
        let service = CategoryService::new(&store);

        let created = service.create(new("Rent", EntryKind::Expense)).unwrap();
        assert_eq!(created.id, 1);
        assert_eq!(service.find(1).unwrap(), created);
        assert_eq!(service.resolve("rent").unwrap().id, 1);
        assert_eq!(service.resolve("1").unwrap().name, "Rent");
        assert!(service.resolve("Nope").unwrap_err().is_not_found());
    }

    #[test]
    fn test_create_validates() {
        let store = MemoryStore::new();
        let service = CategoryService::new(&store);

        let err = service
            .create(NewCategory::new("x".repeat(51), EntryKind::Expense, ""))
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.issues().len(), 2);
        assert!(service.list(None).unwrap().is_empty());
    }

    #[test]
    fn test_list_filters_and_orders_by_name() {
        let store = MemoryStore::new();
        let service = CategoryService::new(&store);
        service.create(new("Rent", EntryKind::Expense)).unwrap();
        service.create(new("Salary", EntryKind::Income)).unwrap();
        service.create(new("Groceries", EntryKind::Expense)).unwrap();

        let names: Vec<String> = service
            .list(Some(EntryKind::Expense))
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Groceries", "Rent"]);
        assert_eq!(service.list(None).unwrap().len(), 3);
    }

    #[test]
    fn test_update_keeps_identity() {
        let store = MemoryStore::new();
        let service = CategoryService::new(&store);
        let created = service.create(new("Rent", EntryKind::Expense)).unwrap();

        let updated = service
            .update(
                created.id,
                CategoryPatch {
                    name: Some("Housing".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Housing");
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);

        assert!(service
            .update(99, CategoryPatch::default())
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_delete_orphans_dependents() {
        let store = MemoryStore::new();
        let categories = CategoryService::new(&store);
        let accounts = AccountService::new(&store);

        let food = categories.create(new("Food", EntryKind::Expense)).unwrap();
        accounts
            .create(NewAccount::new(-250, EntryKind::Expense, food.id, "Lunch"))
            .unwrap();

        categories.delete(food.id).unwrap();
        assert!(categories.get(food.id).unwrap().is_none());

        let remaining: Vec<Account> = accounts.list(None).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].category_id, food.id);

        assert!(categories.delete(food.id).unwrap_err().is_not_found());
    }
}
