//! Core data models for pocket-ledger
//!
//! The three record kinds held by the record store: ledger entries
//! (`Account`), categories and budgets. Each comes with a `New*` shape used
//! when the store assigns the id and timestamps, and a `*Patch` shape for
//! partial updates.

pub mod account;
pub mod budget;
pub mod category;
pub mod kind;

pub use account::{Account, AccountPatch, AccountStatus, NewAccount};
pub use budget::{Budget, BudgetPatch, NewBudget};
pub use category::{Category, CategoryPatch, NewCategory};
pub use kind::EntryKind;

use chrono::{DateTime, Duration, Utc};

/// Store-assigned numeric key. Auto-increment starts at 1.
pub type RecordId = u64;

/// Timestamp for a mutation of a record last touched at `previous`.
///
/// Always strictly later than `previous`, so incremental backups can rely on
/// `updated_at` changing whenever a record does.
pub(crate) fn advance_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_timestamp_is_strictly_later() {
        let future = Utc::now() + Duration::hours(1);
        let next = advance_timestamp(future);
        assert!(next > future);

        let past = Utc::now() - Duration::hours(1);
        assert!(advance_timestamp(past) > past);
    }
}
