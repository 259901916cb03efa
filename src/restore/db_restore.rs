use anyhow::Result;
use tracing::info;

use crate::archive::{DumpKind, UnpackedBackup};
use crate::config::ResolvedConfig;
use crate::errors::AppError;
use crate::logging::run_captured;
use crate::utils::{self, setting};

/// Makes sure `target_db` exists and is empty before a restore. An existing
/// database is only dropped when `drop_existing` was requested; active
/// backends are terminated first so the drop cannot hang on them.
pub async fn prepare_target_database(
    config: &ResolvedConfig,
    target_db: &str,
    drop_existing: bool,
) -> Result<()> {
    let mut conn = setting::admin_connect(config).await?;
    let exists = setting::database_exists(&mut conn, target_db).await?;

    if exists {
        if !drop_existing {
            return Err(AppError::Create {
                db: target_db.to_string(),
                output: "database already exists; pass --drop-existing to overwrite".to_string(),
            }
            .into());
        }
        info!("Dropping existing database '{}' before restore", target_db);
        setting::terminate_connections(&mut conn, target_db).await?;
        drop_database(config, target_db)?;
    }

    create_database(config, target_db)?;
    Ok(())
}

/// Restores the dump into `db_name`, routing custom-format dumps through
/// `pg_restore` and plain SQL dumps through `psql`.
pub fn restore_dump(
    config: &ResolvedConfig,
    db_name: &str,
    unpacked: &UnpackedBackup,
) -> Result<()> {
    let result = match unpacked.dump_kind {
        DumpKind::Custom => {
            let pg_restore = utils::find_executable("pg_restore")?;
            let mut cmd = utils::pg_command(&pg_restore, config);
            cmd.arg("--no-owner")
                .args(["-d", db_name])
                .arg(&unpacked.dump_path);
            run_captured(&format!("pg_restore for '{}'", db_name), &mut cmd)?
        }
        DumpKind::Plain => {
            let psql = utils::find_executable("psql")?;
            let mut cmd = utils::pg_command(&psql, config);
            cmd.arg("-X")
                .arg("-q")
                .args(["-v", "ON_ERROR_STOP=1"])
                .args(["-d", db_name])
                .arg("-f")
                .arg(&unpacked.dump_path);
            run_captured(&format!("psql restore for '{}'", db_name), &mut cmd)?
        }
    };

    if !result.success() {
        return Err(AppError::Restore {
            db: db_name.to_string(),
            output: result.output,
        }
        .into());
    }
    Ok(())
}

/// Creates a database with the `createdb` utility.
pub fn create_database(config: &ResolvedConfig, db_name: &str) -> Result<()> {
    let createdb = utils::find_executable("createdb")?;
    let mut cmd = utils::pg_command(&createdb, config);
    cmd.arg(db_name);

    let result = run_captured(&format!("createdb for '{}'", db_name), &mut cmd)?;
    if !result.success() {
        return Err(AppError::Create {
            db: db_name.to_string(),
            output: result.output,
        }
        .into());
    }
    info!("✓ Database '{}' created", db_name);
    Ok(())
}

/// Drops a database with the `dropdb` utility. `--if-exists` keeps the
/// operation a no-op for databases that are already gone.
pub fn drop_database(config: &ResolvedConfig, db_name: &str) -> Result<()> {
    let dropdb = utils::find_executable("dropdb")?;
    let mut cmd = utils::pg_command(&dropdb, config);
    cmd.arg("--if-exists").arg(db_name);

    let result = run_captured(&format!("dropdb for '{}'", db_name), &mut cmd)?;
    if !result.success() {
        return Err(AppError::Drop {
            db: db_name.to_string(),
            output: result.output,
        }
        .into());
    }
    info!("✓ Database '{}' dropped", db_name);
    Ok(())
}
