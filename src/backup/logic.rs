use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::{info, warn};

use crate::archive;
use crate::config::ResolvedConfig;
use crate::errors::AppError;
use crate::filestore;
use crate::retention;
use crate::utils::{self, setting::check_db_connection};

use super::db_dump;

pub async fn perform_backup_orchestration(config: &ResolvedConfig) -> Result<()> {
    let backup_dir = config.backup_dir.as_deref().ok_or_else(|| {
        AppError::Config(
            "No backup directory resolvable. Set backup_dir in the backup configuration or pass --backup-dir.".to_string(),
        )
    })?;
    if config.db_names.is_empty() {
        return Err(AppError::Config(
            "No database names specified in config files or command-line arguments".to_string(),
        )
        .into());
    }
    for db_name in &config.db_names {
        utils::validate_db_name(db_name)?;
    }

    if !check_db_connection(config).await {
        anyhow::bail!("Cannot proceed with backup: database connection failed");
    }

    std::fs::create_dir_all(backup_dir)
        .with_context(|| format!("Failed to create backup directory: {}", backup_dir.display()))?;

    info!("Databases to back up: {:?}", config.db_names);
    for db_name in &config.db_names {
        let archive_path = backup_single_database(config, db_name, backup_dir)
            .with_context(|| format!("Backup failed for database '{}'", db_name))?;
        info!(
            "✓ Backup successfully created for '{}' at {}",
            db_name,
            archive_path.display()
        );
    }

    let swept = retention::sweep_backups(backup_dir, config.backup_retention_days)
        .context("Backup retention sweep failed")?;
    if swept > 0 {
        info!(
            "Retention sweep removed {} backup(s) older than {} day(s)",
            swept, config.backup_retention_days
        );
    }
    Ok(())
}

fn backup_single_database(
    config: &ResolvedConfig,
    db_name: &str,
    backup_dir: &Path,
) -> Result<std::path::PathBuf> {
    info!("Backing up database: {}", db_name);

    let scratch = tempfile::tempdir().context("Failed to create scratch directory for dump")?;
    let dump_path = scratch.path().join(archive::DUMP_ENTRY_CUSTOM);
    db_dump::dump_database(config, db_name, &dump_path)?;

    let filestore_dir = filestore::filestore_path(&config.filestore_root, db_name);
    let filestore_for_archive = if !config.include_filestore {
        None
    } else if filestore_dir.is_dir() {
        Some(filestore_dir)
    } else {
        warn!(
            "Filestore path {} does not exist; archiving the dump alone",
            filestore_dir.display()
        );
        None
    };

    let archive_name = archive::backup_archive_name(db_name, &Local::now());
    let out_path = backup_dir.join(archive_name);
    archive::pack_backup(
        &dump_path,
        filestore_for_archive.as_deref(),
        db_name,
        &out_path,
    )?;
    Ok(out_path)
}
