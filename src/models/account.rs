//! Ledger entry model
//!
//! An `Account` is a single income or expense entry booked against a
//! category. Amounts are signed integers in minor currency units.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::kind::EntryKind;
use super::{advance_timestamp, RecordId};

/// Lifecycle status added by schema version 2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Active,
    Archived,
}

/// A ledger entry as stored and exported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Store-assigned identifier
    pub id: RecordId,

    /// Signed amount in minor units
    pub amount: i64,

    /// Income or expense
    #[serde(rename = "type")]
    pub kind: EntryKind,

    /// Category this entry is booked against
    pub category_id: RecordId,

    /// Free-form description (1-500 chars)
    pub description: String,

    /// Labels; absent on rows written before schema version 2
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,

    /// Absent on rows written before schema version 2
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AccountStatus>,

    /// Set once when the store inserts the row
    pub created_at: DateTime<Utc>,

    /// Refreshed on every mutation
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied by the caller when adding an entry
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    pub amount: i64,
    pub kind: EntryKind,
    pub category_id: RecordId,
    pub description: String,
    pub tags: Vec<String>,
}

impl NewAccount {
    pub fn new(
        amount: i64,
        kind: EntryKind,
        category_id: RecordId,
        description: impl Into<String>,
    ) -> Self {
        Self {
            amount,
            kind,
            category_id,
            description: description.into(),
            tags: Vec::new(),
        }
    }
}

/// Partial update; `None` leaves the field untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountPatch {
    pub amount: Option<i64>,
    pub kind: Option<EntryKind>,
    pub category_id: Option<RecordId>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub status: Option<AccountStatus>,
}

impl Account {
    /// Materialise a new row with the store-assigned id and timestamp
    pub fn from_new(id: RecordId, new: NewAccount, now: DateTime<Utc>) -> Self {
        Self {
            id,
            amount: new.amount,
            kind: new.kind,
            category_id: new.category_id,
            description: new.description,
            tags: Some(new.tags),
            status: Some(AccountStatus::Active),
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update, advancing `updated_at`
    pub fn apply_patch(&mut self, patch: AccountPatch) {
        if let Some(amount) = patch.amount {
            self.amount = amount;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(category_id) = patch.category_id {
            self.category_id = category_id;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(tags) = patch.tags {
            self.tags = Some(tags);
        }
        if let Some(status) = patch.status {
            self.status = Some(status);
        }
        self.updated_at = advance_timestamp(self.updated_at);
    }
}

impl From<&Account> for AccountPatch {
    fn from(account: &Account) -> Self {
        Self {
            amount: Some(account.amount),
            kind: Some(account.kind),
            category_id: Some(account.category_id),
            description: Some(account.description.clone()),
            tags: account.tags.clone(),
            status: account.status,
        }
    }
}

impl From<&NewAccount> for AccountPatch {
    fn from(new: &NewAccount) -> Self {
        Self {
            amount: Some(new.amount),
            kind: Some(new.kind),
            category_id: Some(new.category_id),
            description: Some(new.description.clone()),
            tags: Some(new.tags.clone()),
            status: None,
        }
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} {} ({})", self.id, self.kind, self.amount, self.description)
    }
}
