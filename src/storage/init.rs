//! Storage initialization
//!
//! Handles first-run setup and default data creation

use tracing::info;

use crate::config::LedgerPaths;
use crate::error::LedgerResult;
use crate::models::{Category, EntryKind, NewCategory};

use super::{JsonFileStore, RecordStore, TableName};

/// Starter categories written to a fresh ledger
const DEFAULT_CATEGORIES: &[(&str, EntryKind, &str)] = &[
    ("Salary", EntryKind::Income, "$"),
    ("Other Income", EntryKind::Income, "+"),
    ("Rent", EntryKind::Expense, "H"),
    ("Groceries", EntryKind::Expense, "G"),
    ("Transport", EntryKind::Expense, "T"),
    ("Dining Out", EntryKind::Expense, "D"),
    ("Utilities", EntryKind::Expense, "U"),
];

/// Initialize storage for a fresh installation.
///
/// Returns `true` if a new ledger file was created.
pub fn initialize_storage(paths: &LedgerPaths) -> LedgerResult<bool> {
    paths.ensure_directories()?;

    if !needs_initialization(paths) {
        return Ok(false);
    }

    let store = JsonFileStore::open(paths.ledger_file())?;
    let created = store.write(&[TableName::Categories], |tx| {
        for (name, kind, icon) in DEFAULT_CATEGORIES {
            tx.add::<Category>(NewCategory::new(*name, *kind, *icon))?;
        }
        Ok(DEFAULT_CATEGORIES.len())
    })?;

    info!(categories = created, path = %paths.ledger_file().display(), "Created ledger");
    Ok(true)
}

/// Check if storage needs initialization
pub fn needs_initialization(paths: &LedgerPaths) -> bool {
    !paths.ledger_file().exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::write_json_atomic;
    use crate::storage::Dataset;
    use tempfile::TempDir;

    #[test]
    fn test_initialize_storage() {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());

        assert!(needs_initialization(&paths));
        assert!(initialize_storage(&paths).unwrap());

        assert!(!needs_initialization(&paths));
        assert!(paths.ledger_file().exists());
        assert!(paths.state_dir().exists());
        assert!(paths.backup_dir().exists());
    }

    #[test]
    fn test_default_categories_created() {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        initialize_storage(&paths).unwrap();

        let store = JsonFileStore::open(paths.ledger_file()).unwrap();
        let categories = store
            .read(&[TableName::Categories], |tx| tx.get_all::<Category>())
            .unwrap();
        assert_eq!(categories.len(), DEFAULT_CATEGORIES.len());
        assert!(categories.iter().any(|c| c.name == "Salary" && c.kind == EntryKind::Income));
        assert!(categories.iter().any(|c| c.name == "Rent" && c.kind == EntryKind::Expense));
    }

    #[test]
    fn test_doesnt_overwrite_existing() {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        initialize_storage(&paths).unwrap();

        write_json_atomic(paths.ledger_file(), &Dataset::default()).unwrap();
        assert!(!initialize_storage(&paths).unwrap());

        let store = JsonFileStore::open(paths.ledger_file()).unwrap();
        assert!(store.snapshot().unwrap().categories.is_empty());
    }
}
