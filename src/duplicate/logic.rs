use std::fs;
use std::process::Stdio;

use anyhow::{Context, Result};
use tracing::{error, info};

use crate::config::ResolvedConfig;
use crate::errors::AppError;
use crate::filestore;
use crate::restore::db_restore::{create_database, drop_database};
use crate::utils::{self, setting};

pub async fn perform_duplicate_orchestration(
    config: &ResolvedConfig,
    source_db: &str,
    target_db: &str,
) -> Result<()> {
    utils::validate_db_name(source_db)?;
    utils::validate_db_name(target_db)?;
    if source_db == target_db {
        return Err(AppError::Config(
            "Source and target database names must differ".to_string(),
        )
        .into());
    }

    let mut conn = setting::admin_connect(config).await?;
    if !setting::database_exists(&mut conn, source_db).await? {
        return Err(AppError::Config(format!(
            "Source database '{}' does not exist",
            source_db
        ))
        .into());
    }
    if setting::database_exists(&mut conn, target_db).await? {
        if !config.drop_existing {
            return Err(AppError::Create {
                db: target_db.to_string(),
                output: "database already exists; pass --drop-existing to overwrite".to_string(),
            }
            .into());
        }
        info!("Dropping existing target database '{}'", target_db);
        setting::terminate_connections(&mut conn, target_db).await?;
        drop_database(config, target_db)?;
    }

    create_database(config, target_db)?;
    pipe_dump_into_restore(config, source_db, target_db)?;
    info!("✓ Database '{}' duplicated to '{}'", source_db, target_db);

    if config.include_filestore {
        filestore::duplicate_filestore(&config.filestore_root, source_db, target_db)?;
    }
    Ok(())
}

/// Streams `pg_dump -F c` of the source straight into `pg_restore` on the
/// target. No intermediate archive touches the backup directory; each
/// utility's stderr goes to its own scratch file and is folded into the
/// log only on failure.
fn pipe_dump_into_restore(
    config: &ResolvedConfig,
    source_db: &str,
    target_db: &str,
) -> Result<()> {
    let pg_dump = utils::find_executable("pg_dump")?;
    let pg_restore = utils::find_executable("pg_restore")?;

    let dump_capture = tempfile::NamedTempFile::new()
        .context("Failed to create scratch file for pg_dump output")?;
    let restore_capture = tempfile::NamedTempFile::new()
        .context("Failed to create scratch file for pg_restore output")?;

    let mut dump_cmd = utils::pg_command(&pg_dump, config);
    dump_cmd
        .args(["-F", "c"])
        .arg(source_db)
        .stdout(Stdio::piped())
        .stderr(Stdio::from(dump_capture.reopen()?));
    let mut dump_child = dump_cmd
        .spawn()
        .with_context(|| format!("Failed to execute pg_dump for '{}'", source_db))?;
    let dump_stdout = dump_child
        .stdout
        .take()
        .context("pg_dump stdout handle unavailable")?;

    let mut restore_cmd = utils::pg_command(&pg_restore, config);
    restore_cmd
        .arg("--no-owner")
        .args(["-d", target_db])
        .stdin(Stdio::from(dump_stdout))
        .stderr(Stdio::from(restore_capture.reopen()?));
    let mut restore_child = restore_cmd
        .spawn()
        .with_context(|| format!("Failed to execute pg_restore for '{}'", target_db))?;

    let restore_status = restore_child.wait().context("Failed to wait on pg_restore")?;
    let dump_status = dump_child.wait().context("Failed to wait on pg_dump")?;

    if !dump_status.success() {
        let output = fs::read_to_string(dump_capture.path()).unwrap_or_default();
        error!(
            "pg_dump for '{}' failed with {}; captured output follows\n{}",
            source_db,
            dump_status,
            output.trim_end()
        );
        return Err(AppError::Dump {
            db: source_db.to_string(),
            output,
        }
        .into());
    }
    if !restore_status.success() {
        let output = fs::read_to_string(restore_capture.path()).unwrap_or_default();
        error!(
            "pg_restore for '{}' failed with {}; captured output follows\n{}",
            target_db,
            restore_status,
            output.trim_end()
        );
        return Err(AppError::Restore {
            db: target_db.to_string(),
            output,
        }
        .into());
    }
    Ok(())
}
