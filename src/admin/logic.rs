use anyhow::Result;
use tracing::info;

use crate::config::ResolvedConfig;
use crate::errors::AppError;
use crate::filestore;
use crate::restore::db_restore::{create_database, drop_database};
use crate::utils::{self, setting};

pub async fn perform_create_orchestration(config: &ResolvedConfig, db_name: &str) -> Result<()> {
    utils::validate_db_name(db_name)?;

    let mut conn = setting::admin_connect(config).await?;
    if setting::database_exists(&mut conn, db_name).await? {
        if !config.drop_existing {
            return Err(AppError::Create {
                db: db_name.to_string(),
                output: "database already exists; pass --drop-existing to recreate".to_string(),
            }
            .into());
        }
        info!("Dropping existing database '{}' before recreation", db_name);
        setting::terminate_connections(&mut conn, db_name).await?;
        drop_database(config, db_name)?;
    }

    create_database(config, db_name)?;
    filestore::create_filestore(&config.filestore_root, db_name)?;
    Ok(())
}

pub async fn perform_drop_orchestration(config: &ResolvedConfig, db_name: &str) -> Result<()> {
    utils::validate_db_name(db_name)?;

    let mut conn = setting::admin_connect(config).await?;
    if setting::database_exists(&mut conn, db_name).await? {
        setting::terminate_connections(&mut conn, db_name).await?;
        drop_database(config, db_name)?;
    } else {
        // Dropping a database that is already gone is a no-op, not an error.
        info!("Database '{}' does not exist; nothing to drop", db_name);
    }

    filestore::delete_filestore(&config.filestore_root, db_name)?;
    Ok(())
}
