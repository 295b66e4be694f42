//! Record validation
//!
//! Pure field checks for ledger entries, categories and budgets. Partial
//! records (patches) only check the fields they supply but apply the same
//! bounds; batch validators fail as a whole if any element fails and report
//! every issue, prefixed with the element's position.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::LedgerError;
use crate::models::{
    Account, AccountPatch, Budget, BudgetPatch, Category, CategoryPatch, NewAccount, NewBudget,
    NewCategory, RecordId,
};

pub const MAX_ACCOUNT_AMOUNT: i64 = 999_999_999;
pub const MIN_ACCOUNT_AMOUNT: i64 = -999_999_999;
pub const MAX_BUDGET_AMOUNT: i64 = 999_999_999;
pub const MAX_DESCRIPTION_LEN: usize = 500;
pub const MAX_CATEGORY_NAME_LEN: usize = 50;
pub const MAX_ICON_LEN: usize = 10;

/// A single failed constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Dotted path to the offending field, e.g. `[3].description`
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// The issues collected by a failed validation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationIssues(pub Vec<ValidationIssue>);

impl ValidationIssues {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<ValidationIssue> {
        self.0
    }

    fn push(&mut self, path: &str, message: impl Into<String>) {
        self.0.push(ValidationIssue::new(path, message));
    }

    fn into_result(self) -> Result<(), ValidationIssues> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationIssues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|i| i.to_string()).collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationIssues {}

impl From<ValidationIssues> for LedgerError {
    fn from(issues: ValidationIssues) -> Self {
        LedgerError::Validation {
            message: issues.to_string(),
            issues: issues.into_vec(),
        }
    }
}

/// Result of validating one record or a batch
pub type ValidationResult = Result<(), ValidationIssues>;

fn check_range(issues: &mut ValidationIssues, path: &str, value: i64, min: i64, max: i64) {
    if value < min {
        issues.push(path, format!("must be at least {}", min));
    } else if value > max {
        issues.push(path, format!("must be at most {}", max));
    }
}

fn check_length(issues: &mut ValidationIssues, path: &str, value: &str, min: usize, max: usize) {
    let len = value.chars().count();
    if len < min {
        issues.push(path, format!("must contain at least {} character(s)", min));
    } else if len > max {
        issues.push(
            path,
            format!("must contain at most {} characters (got {})", max, len),
        );
    }
}

fn check_reference(issues: &mut ValidationIssues, path: &str, id: RecordId) {
    if id == 0 {
        issues.push(path, "must be a positive id");
    }
}

fn check_period(issues: &mut ValidationIssues, start: DateTime<Utc>, end: DateTime<Utc>) {
    if end <= start {
        issues.push("periodEnd", "End date must be after start date");
    }
}

/// Validate the supplied fields of a ledger entry
pub fn validate_account_patch(patch: &AccountPatch) -> ValidationResult {
    let mut issues = ValidationIssues::default();
    if let Some(amount) = patch.amount {
        check_range(&mut issues, "amount", amount, MIN_ACCOUNT_AMOUNT, MAX_ACCOUNT_AMOUNT);
    }
    if let Some(category_id) = patch.category_id {
        check_reference(&mut issues, "categoryId", category_id);
    }
    if let Some(description) = &patch.description {
        check_length(&mut issues, "description", description, 1, MAX_DESCRIPTION_LEN);
    }
    issues.into_result()
}

pub fn validate_account(account: &Account) -> ValidationResult {
    validate_account_patch(&AccountPatch::from(account))
}

pub fn validate_new_account(account: &NewAccount) -> ValidationResult {
    validate_account_patch(&AccountPatch::from(account))
}

/// Validate the supplied fields of a category
pub fn validate_category_patch(patch: &CategoryPatch) -> ValidationResult {
    let mut issues = ValidationIssues::default();
    if let Some(name) = &patch.name {
        check_length(&mut issues, "name", name, 1, MAX_CATEGORY_NAME_LEN);
    }
    if let Some(icon) = &patch.icon {
        check_length(&mut issues, "icon", icon, 1, MAX_ICON_LEN);
    }
    issues.into_result()
}

pub fn validate_category(category: &Category) -> ValidationResult {
    validate_category_patch(&CategoryPatch::from(category))
}

pub fn validate_new_category(category: &NewCategory) -> ValidationResult {
    validate_category_patch(&CategoryPatch::from(category))
}

/// Validate the supplied fields of a budget.
///
/// The period ordering is only checked when both ends are supplied.
pub fn validate_budget_patch(patch: &BudgetPatch) -> ValidationResult {
    let mut issues = ValidationIssues::default();
    if let Some(amount) = patch.amount {
        check_range(&mut issues, "amount", amount, 0, MAX_BUDGET_AMOUNT);
    }
    if let Some(category_id) = patch.category_id {
        check_reference(&mut issues, "categoryId", category_id);
    }
    if let (Some(start), Some(end)) = (patch.period_start, patch.period_end) {
        check_period(&mut issues, start, end);
    }
    issues.into_result()
}

pub fn validate_budget(budget: &Budget) -> ValidationResult {
    validate_budget_patch(&BudgetPatch::from(budget))
}

pub fn validate_new_budget(budget: &NewBudget) -> ValidationResult {
    validate_budget_patch(&BudgetPatch::from(budget))
}

/// Run `validate` over every element, prefixing issue paths with the index
pub fn validate_batch<T>(records: &[T], validate: impl Fn(&T) -> ValidationResult) -> ValidationResult {
    let mut all = ValidationIssues::default();
    for (index, record) in records.iter().enumerate() {
        if let Err(issues) = validate(record) {
            for issue in issues.into_vec() {
                all.0.push(ValidationIssue::new(
                    format!("[{}].{}", index, issue.path),
                    issue.message,
                ));
            }
        }
    }
    all.into_result()
}

pub fn validate_accounts(accounts: &[Account]) -> ValidationResult {
    validate_batch(accounts, validate_account)
}

pub fn validate_categories(categories: &[Category]) -> ValidationResult {
    validate_batch(categories, validate_category)
}

pub fn validate_budgets(budgets: &[Budget]) -> ValidationResult {
    validate_batch(budgets, validate_budget)
}
