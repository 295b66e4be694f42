//! Budget model
//!
//! A spending limit for one category over a half-open time period.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{advance_timestamp, RecordId};

/// A budget as stored and exported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    /// Store-assigned identifier
    pub id: RecordId,

    /// Limit in minor units (0..=999,999,999)
    pub amount: i64,

    /// Category this budget applies to
    pub category_id: RecordId,

    /// Start of the budget period
    pub period_start: DateTime<Utc>,

    /// End of the budget period; strictly after `period_start`
    pub period_end: DateTime<Utc>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewBudget {
    pub amount: i64,
    pub category_id: RecordId,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
}

impl NewBudget {
    pub fn new(
        amount: i64,
        category_id: RecordId,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> Self {
        Self {
            amount,
            category_id,
            period_start,
            period_end,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BudgetPatch {
    pub amount: Option<i64>,
    pub category_id: Option<RecordId>,
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
}

impl Budget {
    pub fn from_new(id: RecordId, new: NewBudget, now: DateTime<Utc>) -> Self {
        Self {
            id,
            amount: new.amount,
            category_id: new.category_id,
            period_start: new.period_start,
            period_end: new.period_end,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_patch(&mut self, patch: BudgetPatch) {
        if let Some(amount) = patch.amount {
            self.amount = amount;
        }
        if let Some(category_id) = patch.category_id {
            self.category_id = category_id;
        }
        if let Some(start) = patch.period_start {
            self.period_start = start;
        }
        if let Some(end) = patch.period_end {
            self.period_end = end;
        }
        self.updated_at = advance_timestamp(self.updated_at);
    }

    /// Whether `instant` falls inside the budget period (inclusive)
    pub fn covers(&self, instant: DateTime<Utc>) -> bool {
        self.period_start <= instant && self.period_end >= instant
    }
}

impl From<&Budget> for BudgetPatch {
    fn from(budget: &Budget) -> Self {
        Self {
            amount: Some(budget.amount),
            category_id: Some(budget.category_id),
            period_start: Some(budget.period_start),
            period_end: Some(budget.period_end),
        }
    }
}

impl From<&NewBudget> for BudgetPatch {
    fn from(new: &NewBudget) -> Self {
        Self {
            amount: Some(new.amount),
            category_id: Some(new.category_id),
            period_start: Some(new.period_start),
            period_end: Some(new.period_end),
        }
    }
}

impl fmt::Display for Budget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} for category {} ({} - {})",
            self.id,
            self.amount,
            self.category_id,
            self.period_start.format("%Y-%m-%d"),
            self.period_end.format("%Y-%m-%d")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn january() -> NewBudget {
        NewBudget::new(
            40_000,
            3,
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 31, 23, 59, 59).unwrap(),
        )
    }

    #[test]
    fn test_covers() {
        let budget = Budget::from_new(1, january(), Utc::now());
        assert!(budget.covers(Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()));
        assert!(budget.covers(budget.period_start));
        assert!(!budget.covers(Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_display() {
        let budget = Budget::from_new(9, january(), Utc::now());
        assert_eq!(
            budget.to_string(),
            "#9 40000 for category 3 (2025-01-01 - 2025-01-31)"
        );
    }
}
