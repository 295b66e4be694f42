use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use pocket_ledger::backup::{BackupEngine, BackupOptions, CompressionType};
use pocket_ledger::cli::{
    handle_account_command, handle_budget_command, handle_category_command, handle_export,
    handle_import, handle_verify,
};
use pocket_ledger::config::{LedgerPaths, Settings};
use pocket_ledger::logging::init_logging;
use pocket_ledger::migrations::{upgrade_store, MigrationRegistry, CURRENT_SCHEMA_VERSION};
use pocket_ledger::models::{Account, Budget, Category};
use pocket_ledger::performance::PerformanceMonitor;
use pocket_ledger::storage::{
    initialize_storage, FileKeyValueStore, JsonFileStore, RecordStore, ALL_TABLES,
};

#[derive(Parser)]
#[command(
    name = "pocket-ledger",
    version,
    about = "Personal-finance ledger with verified backup and restore",
    long_about = "pocket-ledger keeps income and expense entries, categories and \
                  budgets in a local store and exports them as checksum-verified \
                  backups, either full or incremental."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directories, settings and a starter ledger
    Init,

    /// Show current configuration and paths
    Config,

    /// Show record counts, schema version and last backup
    Status,

    /// Upgrade the ledger to the current schema version
    Migrate,

    /// Export a backup
    Export {
        /// Only rows changed since the last incremental export
        #[arg(long)]
        incremental: bool,
        /// Output file ('-' for stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Write plain JSON instead of gzip + base64
        #[arg(long)]
        no_compress: bool,
    },

    /// Check a backup file without restoring it
    Verify {
        /// Backup file, file name in the backup directory, or 'latest'
        backup: String,
    },

    /// Replace the ledger with a backup's content
    Import {
        /// Backup file, file name in the backup directory, or 'latest'
        backup: String,
        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },

    /// Category management commands
    #[command(subcommand)]
    Category(pocket_ledger::cli::CategoryCommands),

    /// Entry management commands
    #[command(subcommand, alias = "entry")]
    Account(pocket_ledger::cli::AccountCommands),

    /// Budget management commands
    #[command(subcommand)]
    Budget(pocket_ledger::cli::BudgetCommands),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let paths = LedgerPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;
    init_logging(&settings.log_level);

    match cli.command {
        Some(Commands::Init) => {
            println!("Initializing pocket-ledger at: {}", paths.base_dir().display());
            let created = initialize_storage(&paths)?;
            settings.save(&paths)?;
            println!("Initialization complete!");
            if created {
                println!();
                println!("Default categories have been created.");
                println!("Run 'pocket-ledger category list' to see them.");
            }
        }

        Some(Commands::Config) => {
            println!("pocket-ledger Configuration");
            println!("===========================");
            println!("Base directory:   {}", paths.base_dir().display());
            println!("Settings file:    {}", paths.settings_file().display());
            println!("Ledger file:      {}", paths.ledger_file().display());
            println!("State directory:  {}", paths.state_dir().display());
            println!("Backup directory: {}", paths.backup_dir().display());
            println!();
            println!("Settings:");
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }

        Some(command) => run_with_store(&paths, &settings, command)?,

        None => {
            println!("pocket-ledger - personal-finance ledger");
            println!();
            println!("Run 'pocket-ledger --help' for usage information.");
            println!("Run 'pocket-ledger init' to get started.");
        }
    }

    Ok(())
}

/// Open the ledger, bring it to the current schema and run `command`
fn run_with_store(paths: &LedgerPaths, settings: &Settings, command: Commands) -> Result<()> {
    paths.ensure_directories()?;

    let store = JsonFileStore::open(paths.ledger_file())?;
    let registry = MigrationRegistry::with_builtin();
    let applied = upgrade_store(&store, &registry)?;

    let kv = FileKeyValueStore::new(paths.state_dir());
    let monitor = PerformanceMonitor::new(settings.monitoring.clone());
    let options = BackupOptions::from_settings(settings);

    match command {
        Commands::Status => {
            let (accounts, categories, budgets) = store.read(&ALL_TABLES, |tx| {
                Ok((
                    tx.count::<Account>()?,
                    tx.count::<Category>()?,
                    tx.count::<Budget>()?,
                ))
            })?;
            let engine = BackupEngine::new(&store, &kv, &registry);

            println!("Ledger Status");
            println!("=============");
            println!("Ledger file:    {}", store.path().display());
            println!("Schema version: {}", store.schema_version()?);
            println!();
            println!("Entries:    {}", accounts);
            println!("Categories: {}", categories);
            println!("Budgets:    {}", budgets);
            println!();
            match engine.load_last_backup()? {
                Some(last) => println!(
                    "Last incremental export: v{} at {}",
                    last.metadata.version,
                    last.metadata.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
                ),
                None => println!("Last incremental export: none"),
            }
        }

        Commands::Migrate => {
            if applied.is_empty() {
                println!(
                    "Ledger is already at schema version {}.",
                    CURRENT_SCHEMA_VERSION
                );
            } else {
                let versions: Vec<String> = applied.iter().map(|v| v.to_string()).collect();
                println!("Applied migrations: {}", versions.join(", "));
                println!("Ledger is now at schema version {}.", CURRENT_SCHEMA_VERSION);
            }
        }

        Commands::Export {
            incremental,
            output,
            no_compress,
        } => {
            let mut options = options;
            if no_compress {
                options.compression = CompressionType::None;
            }
            let engine = BackupEngine::new(&store, &kv, &registry)
                .with_options(options)
                .with_monitor(&monitor);
            handle_export(&engine, paths, incremental, output)?;
        }

        Commands::Verify { backup } => {
            let engine = BackupEngine::new(&store, &kv, &registry)
                .with_options(options)
                .with_monitor(&monitor);
            handle_verify(&engine, paths, &backup)?;
        }

        Commands::Import { backup, force } => {
            let engine = BackupEngine::new(&store, &kv, &registry)
                .with_options(options)
                .with_monitor(&monitor);
            handle_import(&engine, paths, &backup, force)?;
        }

        Commands::Category(cmd) => handle_category_command(&store, &monitor, cmd)?,
        Commands::Account(cmd) => handle_account_command(&store, &monitor, cmd)?,
        Commands::Budget(cmd) => handle_budget_command(&store, &monitor, cmd)?,

        Commands::Init | Commands::Config => {}
    }

    Ok(())
}
