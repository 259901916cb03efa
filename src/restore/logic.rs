use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::archive;
use crate::config::ResolvedConfig;
use crate::errors::AppError;
use crate::filestore;
use crate::utils::{self, setting::check_db_connection};

use super::{db_restore, verification};

pub async fn perform_restore_orchestration(
    config: &ResolvedConfig,
    backup_file: &Path,
    target_db: &str,
) -> Result<()> {
    utils::validate_db_name(target_db)?;
    if !backup_file.is_file() {
        return Err(AppError::Config(format!(
            "Backup file not found: {}",
            backup_file.display()
        ))
        .into());
    }

    // Integrity check happens before any database or filestore mutation;
    // a corrupt archive must leave existing state untouched.
    archive::validate_archive(backup_file)?;
    info!("✓ Archive integrity verified: {}", backup_file.display());

    if !check_db_connection(config).await {
        anyhow::bail!("Cannot proceed with restore: database connection failed");
    }

    let scratch =
        tempfile::tempdir().context("Failed to create scratch directory for extraction")?;
    let unpacked = archive::unpack_archive(backup_file, scratch.path())?;
    info!(
        "Archive extracted to {} (dump: {})",
        scratch.path().display(),
        unpacked.dump_path.display()
    );

    db_restore::prepare_target_database(config, target_db, config.drop_existing).await?;
    db_restore::restore_dump(config, target_db, &unpacked)?;
    info!("✓ Database '{}' restored from dump", target_db);

    if config.include_filestore {
        match &unpacked.filestore_dir {
            Some(extracted) => {
                filestore::install_filestore(extracted, &config.filestore_root, target_db)?;
            }
            None => warn!(
                "No filestore directory found in backup archive {}",
                backup_file.display()
            ),
        }
    }

    verification::verify_restore(config, target_db).await?;
    Ok(())
}
