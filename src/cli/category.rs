//! Category CLI commands

use clap::Subcommand;

use super::parse_kind;
use crate::error::LedgerResult;
use crate::models::{CategoryPatch, NewCategory};
use crate::services::CategoryService;
use crate::performance::PerformanceMonitor;
use crate::storage::RecordStore;

/// Category subcommands
#[derive(Subcommand)]
pub enum CategoryCommands {
    /// List categories
    List {
        /// Only show one type (income or expense)
        #[arg(short = 't', long = "type")]
        kind: Option<String>,
    },

    /// Create a new category
    Add {
        /// Category name
        name: String,
        /// income or expense
        #[arg(short = 't', long = "type", default_value = "expense")]
        kind: String,
        /// Short icon shown next to the name
        #[arg(short, long, default_value = "*")]
        icon: String,
    },

    /// Rename a category or change its icon
    Edit {
        /// Category name or ID
        category: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        icon: Option<String>,
    },

    /// Delete a category (entries and budgets using it are kept)
    Delete {
        /// Category name or ID
        category: String,
    },
}

/// Handle a category command
pub fn handle_category_command<S: RecordStore>(
    store: &S,
    monitor: &PerformanceMonitor,
    cmd: CategoryCommands,
) -> LedgerResult<()> {
    let service = CategoryService::new(store).with_monitor(monitor);

    match cmd {
        CategoryCommands::List { kind } => {
            let kind = kind.as_deref().map(parse_kind).transpose()?;
            let categories = service.list(kind)?;

            if categories.is_empty() {
                println!("No categories found.");
                return Ok(());
            }

            println!("{:>4}  {:<8} {:<4} {}", "ID", "Type", "Icon", "Name");
            for category in &categories {
                println!(
                    "{:>4}  {:<8} {:<4} {}",
                    category.id,
                    category.kind.as_str(),
                    category.icon,
                    category.name
                );
            }
        }

        CategoryCommands::Add { name, kind, icon } => {
            let category = service.create(NewCategory::new(name, parse_kind(&kind)?, icon))?;
            println!("Created category: {}", category.name);
            println!("  Type: {}", category.kind);
            println!("  ID: {}", category.id);
        }

        CategoryCommands::Edit {
            category,
            name,
            icon,
        } => {
            let existing = service.resolve(&category)?;

            if name.is_none() && icon.is_none() {
                println!("No changes specified. Use --name or --icon.");
                return Ok(());
            }

            let updated = service.update(
                existing.id,
                CategoryPatch {
                    name,
                    icon,
                    ..Default::default()
                },
            )?;
            println!("Updated category: {}", updated.name);
        }

        CategoryCommands::Delete { category } => {
            let existing = service.resolve(&category)?;
            service.delete(existing.id)?;
            println!("Deleted category: {}", existing.name);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::performance::{MonitoringConfig, OperationType};
    use crate::storage::{MemoryStore, TableName};

    #[test]
    fn test_commands_are_monitored() {
        let store = MemoryStore::new();
        let monitor = PerformanceMonitor::new(MonitoringConfig {
            sample_rate: 1.0,
            ..MonitoringConfig::default()
        });

        handle_category_command(
            &store,
            &monitor,
            CategoryCommands::Add {
                name: "Food".into(),
                kind: "expense".into(),
                icon: "F".into(),
            },
        )
        .unwrap();
        handle_category_command(&store, &monitor, CategoryCommands::List { kind: None }).unwrap();

        let ops: Vec<OperationType> = monitor
            .metrics()
            .unwrap()
            .into_iter()
            .filter(|m| m.table_name == TableName::Categories)
            .map(|m| m.operation_type)
            .collect();
        assert_eq!(ops, vec![OperationType::Write, OperationType::Query]);
    }
}
