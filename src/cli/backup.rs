//! Backup CLI commands
//!
//! Export, verify and import of backup payloads. Payloads are written to
//! and read from plain files; the default location is the backup
//! directory.

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::backup::{codec, BackupData, BackupEngine, CompressionType};
use crate::config::LedgerPaths;
use crate::error::{LedgerError, LedgerResult};
use crate::storage::file_io::read_text;
use crate::storage::{write_atomic, KeyValueStore, RecordStore};

/// Export a backup to `output`, or to a timestamped file in the backup
/// directory. An output of `-` prints the payload to stdout.
pub fn handle_export<S, K>(
    engine: &BackupEngine<'_, S, K>,
    paths: &LedgerPaths,
    incremental: bool,
    output: Option<PathBuf>,
) -> LedgerResult<()>
where
    S: RecordStore,
    K: KeyValueStore + ?Sized,
{
    let payload = engine.export_backup(incremental)?;

    if output.as_deref() == Some(Path::new("-")) {
        println!("{}", payload);
        return Ok(());
    }

    let path = output.unwrap_or_else(|| {
        paths
            .backup_dir()
            .join(default_backup_name(incremental, engine.options().compression))
    });
    write_atomic(&path, payload.as_bytes())?;

    println!(
        "{} backup written: {}",
        if incremental { "Incremental" } else { "Full" },
        path.display()
    );
    println!("Size: {}", format_size(payload.len() as u64));
    Ok(())
}

/// Check a backup file without touching the store
pub fn handle_verify<S, K>(
    engine: &BackupEngine<'_, S, K>,
    paths: &LedgerPaths,
    backup: &str,
) -> LedgerResult<()>
where
    S: RecordStore,
    K: KeyValueStore + ?Sized,
{
    let path = resolve_backup_path(paths, backup)?;
    let payload = read_text(&path)?;
    let data = engine.verify_backup(&payload)?;

    print_backup_details(&path, &payload, &data);
    println!();
    println!("Backup is valid.");
    Ok(())
}

/// Replace the ledger with a backup's content
pub fn handle_import<S, K>(
    engine: &BackupEngine<'_, S, K>,
    paths: &LedgerPaths,
    backup: &str,
    force: bool,
) -> LedgerResult<()>
where
    S: RecordStore,
    K: KeyValueStore + ?Sized,
{
    let path = resolve_backup_path(paths, backup)?;
    let payload = read_text(&path)?;
    let data = engine.verify_backup(&payload)?;

    print_backup_details(&path, &payload, &data);
    println!();

    if !force {
        println!("WARNING: This will overwrite ALL current data!");
        if data.metadata.is_incremental() {
            println!("This is an incremental backup and holds only the rows changed since the previous export.");
        }
        println!("To proceed, run again with --force flag:");
        println!("  pocket-ledger import {} --force", backup);
        return Ok(());
    }

    println!("Restoring from backup...");
    let summary = engine.import_backup(&payload)?;
    println!("Restore complete!");
    println!("{}", summary.summary());
    Ok(())
}

fn print_backup_details(path: &Path, payload: &str, data: &BackupData) {
    let metadata = &data.metadata;
    println!("Backup Details");
    println!("==============");
    println!("File: {}", path.display());
    println!("Size: {}", format_size(payload.len() as u64));
    println!(
        "Created: {}",
        metadata.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "Version: {} ({})",
        metadata.version,
        if metadata.is_incremental() {
            "incremental"
        } else {
            "full"
        }
    );
    println!("Schema version: {}", metadata.schema_version);
    println!(
        "Compression: {}",
        if codec::is_compressed(payload) {
            "gzip"
        } else {
            "none"
        }
    );
    println!("Checksum: {}", metadata.checksum);
    println!();
    println!("Contents:");
    println!("  Entries:    {}", data.accounts.len());
    println!("  Categories: {}", data.categories.len());
    println!("  Budgets:    {}", data.budgets.len());
}

fn default_backup_name(incremental: bool, compression: CompressionType) -> String {
    let kind = if incremental { "incremental" } else { "full" };
    let extension = match compression {
        CompressionType::Gzip => "b64",
        CompressionType::None => "json",
    };
    format!(
        "ledger-{}-{}.{}",
        kind,
        Utc::now().format("%Y%m%d-%H%M%S%3f"),
        extension
    )
}

/// Resolve a backup identifier to a full path.
///
/// Accepts a path, a file name inside the backup directory, or `latest`.
fn resolve_backup_path(paths: &LedgerPaths, backup: &str) -> LedgerResult<PathBuf> {
    if backup.eq_ignore_ascii_case("latest") {
        return latest_backup(&paths.backup_dir())?.ok_or_else(|| LedgerError::NotFound {
            entity_type: "Backup",
            identifier: "latest".to_string(),
        });
    }

    let path = PathBuf::from(backup);
    if path.exists() {
        return Ok(path);
    }

    let in_backup_dir = paths.backup_dir().join(backup);
    if in_backup_dir.exists() {
        return Ok(in_backup_dir);
    }

    Err(LedgerError::NotFound {
        entity_type: "Backup",
        identifier: backup.to_string(),
    })
}

/// Most recently modified file in `dir`
fn latest_backup(dir: &Path) -> LedgerResult<Option<PathBuf>> {
    if !dir.exists() {
        return Ok(None);
    }

    let mut newest = None;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified()?;
        if newest.as_ref().map_or(true, |(time, _)| modified > *time) {
            newest = Some((modified, entry.path()));
        }
    }
    Ok(newest.map(|(_, path)| path))
}

/// Format a file size in human-readable form
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_backup_name() {
        let name = default_backup_name(true, CompressionType::None);
        assert!(name.starts_with("ledger-incremental-"));
        assert!(name.ends_with(".json"));
        assert!(default_backup_name(false, CompressionType::Gzip).ends_with(".b64"));
    }

    #[test]
    fn test_resolve_backup_path() {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        paths.ensure_directories().unwrap();

        assert!(resolve_backup_path(&paths, "latest")
            .unwrap_err()
            .is_not_found());

        let file = paths.backup_dir().join("one.json");
        std::fs::write(&file, "{}").unwrap();
        assert_eq!(resolve_backup_path(&paths, "one.json").unwrap(), file);
        assert_eq!(resolve_backup_path(&paths, "latest").unwrap(), file);
        assert!(resolve_backup_path(&paths, "missing.json")
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
    }
}
