//! Ledger entry CLI commands
//!
//! Entries live in the `accounts` table; the command is named after it.

use clap::Subcommand;

use super::parse_kind;
use crate::error::LedgerResult;
use crate::models::{NewAccount, RecordId};
use crate::services::{AccountService, CategoryService};
use crate::performance::PerformanceMonitor;
use crate::storage::RecordStore;

/// Entry subcommands
#[derive(Subcommand)]
pub enum AccountCommands {
    /// Record a new income or expense entry
    Add {
        /// Amount in minor units (negative for money going out)
        #[arg(allow_hyphen_values = true)]
        amount: i64,
        /// Category name or ID
        #[arg(short, long)]
        category: String,
        /// What the entry is for
        #[arg(short, long)]
        description: String,
        /// income or expense (defaults to the category's type)
        #[arg(short = 't', long = "type")]
        kind: Option<String>,
        /// Label, may be repeated
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// List entries, oldest first
    List {
        /// Only entries in this category (name or ID)
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Delete an entry
    Delete {
        /// Entry ID
        id: RecordId,
    },
}

/// Handle an entry command
pub fn handle_account_command<S: RecordStore>(
    store: &S,
    monitor: &PerformanceMonitor,
    cmd: AccountCommands,
) -> LedgerResult<()> {
    let service = AccountService::new(store).with_monitor(monitor);
    let categories = CategoryService::new(store).with_monitor(monitor);

    match cmd {
        AccountCommands::Add {
            amount,
            category,
            description,
            kind,
            tags,
        } => {
            let category = categories.resolve(&category)?;
            let kind = match kind {
                Some(kind) => parse_kind(&kind)?,
                None => category.kind,
            };

            let mut new = NewAccount::new(amount, kind, category.id, description);
            new.tags = tags;
            let entry = service.create(new)?;

            println!("Recorded entry #{}: {}", entry.id, entry.description);
            println!("  Amount: {}", entry.amount);
            println!("  Category: {}", category.name);
        }

        AccountCommands::List { category } => {
            let category_id = match category {
                Some(identifier) => Some(categories.resolve(&identifier)?.id),
                None => None,
            };
            let entries = service.list(category_id)?;

            if entries.is_empty() {
                println!("No entries found.");
                return Ok(());
            }

            println!(
                "{:>4}  {:<10} {:<8} {:>12}  {}",
                "ID", "Date", "Type", "Amount", "Description"
            );
            for entry in &entries {
                println!(
                    "{:>4}  {:<10} {:<8} {:>12}  {}",
                    entry.id,
                    entry.created_at.format("%Y-%m-%d"),
                    entry.kind.as_str(),
                    entry.amount,
                    entry.description
                );
            }
            let total: i64 = entries.iter().map(|e| e.amount).sum();
            println!();
            println!("Total: {} ({} entries)", total, entries.len());
        }

        AccountCommands::Delete { id } => {
            let entry = service.delete(id)?;
            println!("Deleted entry #{}: {}", entry.id, entry.description);
        }
    }

    Ok(())
}
