//! Schema migrations
//!
//! A [`MigrationRegistry`] maps schema versions to transformation steps.
//! Migrating from `old` to `new` runs every registered step whose version
//! lies in `(old, new]`, lowest version first, inside the caller's
//! transaction. Versions without a step are skipped.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{info, warn};

use crate::error::{classify, EngineFailure, LedgerError, LedgerResult};
use crate::models::{Account, AccountStatus, Category};
use crate::storage::{Record, RecordStore, Transaction, ALL_TABLES};

/// Schema version written by this build
pub const CURRENT_SCHEMA_VERSION: u32 = 3;

/// The version range a migration run covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationContext {
    pub old_version: u32,
    pub new_version: u32,
}

type StepFn = dyn Fn(&mut Transaction<'_>, &MigrationContext) -> LedgerResult<()> + Send + Sync;

struct MigrationStep {
    description: String,
    run: Box<StepFn>,
}

/// Versioned migration steps
#[derive(Default)]
pub struct MigrationRegistry {
    steps: BTreeMap<u32, MigrationStep>,
}

impl fmt::Debug for MigrationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.steps.iter().map(|(v, s)| (v, &s.description)))
            .finish()
    }
}

impl MigrationRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the steps that bring stores up to
    /// [`CURRENT_SCHEMA_VERSION`]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.insert(2, "backfill entry tags and status", backfill_account_fields);
        registry.insert(3, "normalise category names and icons", normalise_categories);
        registry
    }

    /// Register `step` for `version`. A second registration for the same
    /// version replaces the first.
    pub fn register<F>(
        &mut self,
        version: u32,
        description: impl Into<String>,
        step: F,
    ) -> LedgerResult<()>
    where
        F: Fn(&mut Transaction<'_>, &MigrationContext) -> LedgerResult<()> + Send + Sync + 'static,
    {
        if version == 0 {
            return Err(LedgerError::Migration {
                version,
                cause: "migration versions start at 1".into(),
            });
        }
        self.insert(version, description, step);
        Ok(())
    }

    fn insert<F>(&mut self, version: u32, description: impl Into<String>, step: F)
    where
        F: Fn(&mut Transaction<'_>, &MigrationContext) -> LedgerResult<()> + Send + Sync + 'static,
    {
        let step = MigrationStep {
            description: description.into(),
            run: Box::new(step),
        };
        if self.steps.insert(version, step).is_some() {
            warn!(version, "Replacing previously registered migration");
        }
    }

    /// Registered versions, ascending
    pub fn versions(&self) -> Vec<u32> {
        self.steps.keys().copied().collect()
    }

    /// Highest registered version
    pub fn latest(&self) -> Option<u32> {
        self.steps.keys().next_back().copied()
    }

    /// Apply every step in `(old_version, new_version]` in ascending order.
    ///
    /// Returns the versions whose steps ran. The first failing step aborts
    /// the run with [`LedgerError::Migration`] carrying its version; undoing
    /// earlier steps is left to the enclosing transaction.
    pub fn migrate(
        &self,
        old_version: u32,
        new_version: u32,
        tx: &mut Transaction<'_>,
    ) -> LedgerResult<Vec<u32>> {
        if new_version < old_version {
            return Err(LedgerError::Migration {
                version: new_version,
                cause: format!(
                    "cannot migrate backwards from version {} to {}",
                    old_version, new_version
                ),
            });
        }

        let context = MigrationContext {
            old_version,
            new_version,
        };

        let mut applied = Vec::new();
        if new_version == old_version {
            return Ok(applied);
        }

        for (&version, step) in self.steps.range(old_version + 1..=new_version) {
            (step.run)(tx, &context).map_err(|err| LedgerError::Migration {
                version,
                cause: err.to_string(),
            })?;
            info!(version, description = %step.description, "Applied migration");
            applied.push(version);
        }

        Ok(applied)
    }
}

/// Rewrite every row of a table in place.
///
/// Rows that `transform` changes get a fresh `updated_at` so incremental
/// exports pick them up; `id` and `created_at` are kept. Untouched rows are
/// not written. Returns the number of rows changed.
pub fn rewrite_table<T, F>(tx: &mut Transaction<'_>, mut transform: F) -> LedgerResult<usize>
where
    T: Record,
    F: FnMut(&mut T),
{
    let mut changed = 0;
    for original in tx.get_all::<T>()? {
        let mut row = original.clone();
        transform(&mut row);
        if row != original {
            row.touch();
            tx.put(row)?;
            changed += 1;
        }
    }
    Ok(changed)
}

/// Trimmed copy of `value`, or `None` when trimming is a no-op or would
/// leave nothing
fn trimmed(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.len() == value.len() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn backfill_account_fields(tx: &mut Transaction<'_>, _: &MigrationContext) -> LedgerResult<()> {
    rewrite_table::<Account, _>(tx, |account| {
        account.tags.get_or_insert_with(Vec::new);
        account.status.get_or_insert(AccountStatus::Active);
    })?;
    Ok(())
}

fn normalise_categories(tx: &mut Transaction<'_>, _: &MigrationContext) -> LedgerResult<()> {
    rewrite_table::<Category, _>(tx, |category| {
        if let Some(name) = trimmed(&category.name) {
            category.name = name;
        }
        if let Some(icon) = trimmed(&category.icon) {
            category.icon = icon;
        }
    })?;
    Ok(())
}

/// Bring a store up to [`CURRENT_SCHEMA_VERSION`].
///
/// Runs inside one read-write transaction over all tables and records the
/// new version on success. A store already at the current version is left
/// alone; one written by a newer build is refused with a migration error.
pub fn upgrade_store<S: RecordStore>(store: &S, registry: &MigrationRegistry) -> LedgerResult<Vec<u32>> {
    let stored = store.schema_version().map_err(classify)?;

    if stored > CURRENT_SCHEMA_VERSION {
        return Err(classify(
            EngineFailure::VersionMismatch {
                found: stored,
                supported: CURRENT_SCHEMA_VERSION,
            }
            .into(),
        ));
    }
    if stored == CURRENT_SCHEMA_VERSION {
        return Ok(Vec::new());
    }

    info!(
        from = stored,
        to = CURRENT_SCHEMA_VERSION,
        "Database version changing"
    );
    store.write(&ALL_TABLES, |tx| {
        let applied = registry.migrate(stored, CURRENT_SCHEMA_VERSION, tx)?;
        tx.set_schema_version(CURRENT_SCHEMA_VERSION)?;
        Ok(applied)
    })
}
