//! Budget CLI commands

use clap::Subcommand;

use super::parse_date;
use crate::error::LedgerResult;
use crate::models::{NewBudget, RecordId};
use crate::services::{BudgetService, CategoryService};
use crate::performance::PerformanceMonitor;
use crate::storage::RecordStore;

/// Budget subcommands
#[derive(Subcommand)]
pub enum BudgetCommands {
    /// Set a spending limit for a category over a period
    Add {
        /// Limit in minor units
        amount: i64,
        /// Category name or ID
        #[arg(short, long)]
        category: String,
        /// Period start (YYYY-MM-DD)
        #[arg(long)]
        start: String,
        /// Period end (YYYY-MM-DD), after the start
        #[arg(long)]
        end: String,
    },

    /// List budgets ordered by period start
    List {
        /// Only budgets for this category (name or ID)
        #[arg(short, long)]
        category: Option<String>,
        /// Only budgets whose period contains this date
        #[arg(long)]
        on: Option<String>,
    },

    /// Delete a budget
    Delete {
        /// Budget ID
        id: RecordId,
    },
}

/// Handle a budget command
pub fn handle_budget_command<S: RecordStore>(
    store: &S,
    monitor: &PerformanceMonitor,
    cmd: BudgetCommands,
) -> LedgerResult<()> {
    let service = BudgetService::new(store).with_monitor(monitor);
    let categories = CategoryService::new(store).with_monitor(monitor);

    match cmd {
        BudgetCommands::Add {
            amount,
            category,
            start,
            end,
        } => {
            let category = categories.resolve(&category)?;
            let budget = service.create(NewBudget::new(
                amount,
                category.id,
                parse_date(&start)?,
                parse_date(&end)?,
            ))?;

            println!("Created budget #{} for {}", budget.id, category.name);
            println!("  Limit: {}", budget.amount);
            println!(
                "  Period: {} to {}",
                budget.period_start.format("%Y-%m-%d"),
                budget.period_end.format("%Y-%m-%d")
            );
        }

        BudgetCommands::List { category, on } => {
            let category_id = match category {
                Some(identifier) => Some(categories.resolve(&identifier)?.id),
                None => None,
            };
            let covering = on.as_deref().map(parse_date).transpose()?;
            let budgets = service.list(category_id, covering)?;

            if budgets.is_empty() {
                println!("No budgets found.");
                return Ok(());
            }

            println!(
                "{:>4}  {:<10} {:<10} {:>12}  {}",
                "ID", "Start", "End", "Limit", "Category"
            );
            for budget in &budgets {
                let name = categories
                    .get(budget.category_id)?
                    .map(|c| c.name)
                    .unwrap_or_else(|| format!("(deleted #{})", budget.category_id));
                println!(
                    "{:>4}  {:<10} {:<10} {:>12}  {}",
                    budget.id,
                    budget.period_start.format("%Y-%m-%d"),
                    budget.period_end.format("%Y-%m-%d"),
                    budget.amount,
                    name
                );
            }
        }

        BudgetCommands::Delete { id } => {
            let budget = service.delete(id)?;
            println!("Deleted budget #{}", budget.id);
        }
    }

    Ok(())
}
