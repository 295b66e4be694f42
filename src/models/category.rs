//! Category model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::kind::EntryKind;
use super::{advance_timestamp, RecordId};

/// A category entries and budgets are booked against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Store-assigned identifier
    pub id: RecordId,

    /// Category name (1-50 chars, conventionally unique)
    pub name: String,

    /// Income or expense
    #[serde(rename = "type")]
    pub kind: EntryKind,

    /// Short icon, usually an emoji (1-10 chars)
    pub icon: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCategory {
    pub name: String,
    pub kind: EntryKind,
    pub icon: String,
}

impl NewCategory {
    pub fn new(name: impl Into<String>, kind: EntryKind, icon: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            icon: icon.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub kind: Option<EntryKind>,
    pub icon: Option<String>,
}

impl Category {
    pub fn from_new(id: RecordId, new: NewCategory, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: new.name,
            kind: new.kind,
            icon: new.icon,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_patch(&mut self, patch: CategoryPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(icon) = patch.icon {
            self.icon = icon;
        }
        self.updated_at = advance_timestamp(self.updated_at);
    }
}

impl From<&Category> for CategoryPatch {
    fn from(category: &Category) -> Self {
        Self {
            name: Some(category.name.clone()),
            kind: Some(category.kind),
            icon: Some(category.icon.clone()),
        }
    }
}

impl From<&NewCategory> for CategoryPatch {
    fn from(new: &NewCategory) -> Self {
        Self {
            name: Some(new.name.clone()),
            kind: Some(new.kind),
            icon: Some(new.icon.clone()),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.icon, self.name)
    }
}
