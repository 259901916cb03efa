use std::path::Path;

use anyhow::Result;
use tracing::info;

use crate::config::ResolvedConfig;
use crate::errors::AppError;
use crate::logging::run_captured;
use crate::utils;

/// Dumps `db_name` to `destination` with `pg_dump` in the compressed
/// custom format. Captured utility output surfaces in the error on failure.
pub fn dump_database(config: &ResolvedConfig, db_name: &str, destination: &Path) -> Result<()> {
    let pg_dump = utils::find_executable("pg_dump")?;

    let mut cmd = utils::pg_command(&pg_dump, config);
    cmd.args(["-F", "c"])
        .arg("-f")
        .arg(destination)
        .arg(db_name);

    let result = run_captured(&format!("pg_dump for '{}'", db_name), &mut cmd)?;
    if !result.success() {
        return Err(AppError::Dump {
            db: db_name.to_string(),
            output: result.output,
        }
        .into());
    }

    info!("✓ Dumped '{}' to {}", db_name, destination.display());
    Ok(())
}
