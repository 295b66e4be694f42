//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the service layer.

pub mod account;
pub mod backup;
pub mod budget;
pub mod category;

pub use account::{handle_account_command, AccountCommands};
pub use backup::{handle_export, handle_import, handle_verify};
pub use budget::{handle_budget_command, BudgetCommands};
pub use category::{handle_category_command, CategoryCommands};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::error::{LedgerError, LedgerResult};
use crate::models::EntryKind;

/// Parse `YYYY-MM-DD` (midnight UTC) or a full RFC 3339 timestamp
pub(crate) fn parse_date(value: &str) -> LedgerResult<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&midnight));
        }
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| invalid_argument(format!("Invalid date '{}', expected YYYY-MM-DD", value)))
}

/// Parse an entry kind name
pub(crate) fn parse_kind(value: &str) -> LedgerResult<EntryKind> {
    EntryKind::parse(value).ok_or_else(|| {
        invalid_argument(format!(
            "Invalid type '{}', expected 'income' or 'expense'",
            value
        ))
    })
}

fn invalid_argument(message: String) -> LedgerError {
    LedgerError::Validation {
        message,
        issues: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-03-01").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_date("2024-03-01T12:30:00+02:00").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap()
        );
        assert!(parse_date("01/03/2024").unwrap_err().is_validation());
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!(parse_kind("Income").unwrap(), EntryKind::Income);
        assert!(parse_kind("transfer").is_err());
    }
}
