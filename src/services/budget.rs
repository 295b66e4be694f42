//! Budget service

use chrono::{DateTime, Utc};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Budget, BudgetPatch, NewBudget, RecordId};
use crate::performance::{tracked, OperationType, PerformanceMonitor, QueryDetails};
use crate::storage::{RecordStore, TableName};
use crate::validation::{validate_budget, validate_budget_patch, validate_new_budget};

use super::ensure_category;

const TABLES: &[TableName] = &[TableName::Budgets, TableName::Categories];

/// Service for budget management
pub struct BudgetService<'a, S> {
    store: &'a S,
    monitor: Option<&'a PerformanceMonitor>,
}

impl<'a, S: RecordStore> BudgetService<'a, S> {
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

    pub fn create(&self, new: NewBudget) -> LedgerResult<Budget> {
        validate_new_budget(&new)?;

        tracked(self.monitor, OperationType::Write, TableName::Budgets, None, || {
            self.store.write(TABLES, |tx| {
                ensure_category(tx, new.category_id)?;
                let id = tx.add::<Budget>(new)?;
                tx.get(id)?.ok_or_else(|| LedgerError::budget_not_found(id))
            })
        })
    }

    pub fn get(&self, id: RecordId) -> LedgerResult<Option<Budget>> {
        self.store.read(TABLES, |tx| tx.get(id))
    }

    pub fn find(&self, id: RecordId) -> LedgerResult<Budget> {
        self.get(id)?.ok_or_else(|| LedgerError::budget_not_found(id))
    }

    /// Budgets ordered by period start.
    ///
    /// `category_id` limits the result to one category; `covering` keeps only
    /// budgets whose period contains that instant.
    pub fn list(
        &self,
        category_id: Option<RecordId>,
        covering: Option<DateTime<Utc>>,
    ) -> LedgerResult<Vec<Budget>> {
        let mut filters = Vec::new();
        if let Some(id) = category_id {
            filters.push(format!("categoryId={}", id));
        }
        if let Some(at) = covering {
            filters.push(format!("covering={}", at.to_rfc3339()));
        }
        let details = QueryDetails {
            filter: (!filters.is_empty()).then(|| filters.join("&")),
            sort: Some("periodStart".into()),
            limit: None,
        };

        tracked(self.monitor, OperationType::Query, TableName::Budgets, Some(details), || {
            self.store.read(TABLES, |tx| {
                let mut budgets: Vec<Budget> = tx
                    .table::<Budget>()?
                    .iter()
                    .filter(|b| category_id.map_or(true, |id| b.category_id == id))
                    .filter(|b| covering.map_or(true, |at| b.covers(at)))
                    .cloned()
                    .collect();
                budgets.sort_by(|a, b| a.period_start.cmp(&b.period_start).then(a.id.cmp(&b.id)));
                Ok(budgets)
            })
        })
    }

    /// Apply a partial update.
    ///
    /// The merged budget is validated as a whole, so moving only one end of
    /// the period past the other is rejected.
    pub fn update(&self, id: RecordId, patch: BudgetPatch) -> LedgerResult<Budget> {
        validate_budget_patch(&patch)?;

        tracked(self.monitor, OperationType::Write, TableName::Budgets, None, || {
            self.store.write(TABLES, |tx| {
                let mut budget = tx
                    .get::<Budget>(id)?
                    .ok_or_else(|| LedgerError::budget_not_found(id))?;
                if let Some(category_id) = patch.category_id {
                    ensure_category(tx, category_id)?;
                }
                budget.apply_patch(patch);
                validate_budget(&budget)?;
                tx.put(budget.clone())?;
                Ok(budget)
            })
        })
    }

    pub fn delete(&self, id: RecordId) -> LedgerResult<Budget> {
        self.store.write(TABLES, |tx| {
            let budget = tx
                .get::<Budget>(id)?
                .ok_or_else(|| LedgerError::budget_not_found(id))?;
            tx.delete::<Budget>(id)?;
            Ok(budget)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntryKind, NewCategory};
    use crate::services::CategoryService;
    use crate::storage::MemoryStore;
    use chrono::TimeZone;

    fn day(month: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, month, d, 0, 0, 0).unwrap()
    }

    fn setup() -> MemoryStore {
        let store = MemoryStore::new();
        let categories = CategoryService::new(&store);
        categories
            .create(NewCategory::new("Food", EntryKind::Expense, "#"))
            .unwrap();
        categories
            .create(NewCategory::new("Rent", EntryKind::Expense, "@"))
            .unwrap();
        store
    }

    #[test]
    fn test_create_budget() {
        let store = setup();
        let service = BudgetService::new(&store);

        let budget = service
            .create(NewBudget::new(40_000, 1, day(1, 1), day(2, 1)))
            .unwrap();
        assert_eq!(budget.id, 1);
        assert_eq!(service.find(1).unwrap(), budget);
    }

    #[test]
    fn test_create_rejects_reversed_period() {
        let store = setup();
        let service = BudgetService::new(&store);

        let err = service
            .create(NewBudget::new(40_000, 1, day(2, 1), day(1, 1)))
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.issues()[0].path, "periodEnd");
        assert_eq!(err.issues()[0].message, "End date must be after start date");

        let err = service
            .create(NewBudget::new(40_000, 1, day(1, 1), day(1, 1)))
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_create_requires_category() {
        let store = setup();
        let service = BudgetService::new(&store);

        let err = service
            .create(NewBudget::new(100, 3, day(1, 1), day(2, 1)))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_update_validates_merged_period() {
        let store = setup();
        let service = BudgetService::new(&store);
        let budget = service
            .create(NewBudget::new(40_000, 1, day(1, 1), day(2, 1)))
            .unwrap();

        let err = service
            .update(
                budget.id,
                BudgetPatch {
                    period_start: Some(day(3, 1)),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(service.find(budget.id).unwrap(), budget);

        let updated = service
            .update(
                budget.id,
                BudgetPatch {
                    amount: Some(45_000),
                    period_end: Some(day(3, 1)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.amount, 45_000);
        assert_eq!(updated.period_end, day(3, 1));
        assert!(updated.updated_at > budget.updated_at);
        assert_eq!(service.find(budget.id).unwrap(), updated);

        assert!(service
            .update(42, BudgetPatch::default())
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_list_filters() {
        let store = setup();
        let service = BudgetService::new(&store);
        service
            .create(NewBudget::new(100, 1, day(2, 1), day(3, 1)))
            .unwrap();
        service
            .create(NewBudget::new(200, 1, day(1, 1), day(2, 1)))
            .unwrap();
        service
            .create(NewBudget::new(300, 2, day(1, 1), day(12, 31)))
            .unwrap();

        let food: Vec<i64> = service
            .list(Some(1), None)
            .unwrap()
            .into_iter()
            .map(|b| b.amount)
            .collect();
        assert_eq!(food, vec![200, 100]);

        let february: Vec<i64> = service
            .list(None, Some(day(2, 15)))
            .unwrap()
            .into_iter()
            .map(|b| b.amount)
            .collect();
        assert_eq!(february, vec![300, 100]);
    }

    #[test]
    fn test_delete() {
        let store = setup();
        let service = BudgetService::new(&store);
        let budget = service
            .create(NewBudget::new(100, 1, day(1, 1), day(2, 1)))
            .unwrap();

        assert_eq!(service.delete(budget.id).unwrap(), budget);
        assert!(service.get(budget.id).unwrap().is_none());
        assert!(service.delete(budget.id).unwrap_err().is_not_found());
    }
}
