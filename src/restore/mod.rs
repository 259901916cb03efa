mod logic;
pub(crate) mod db_restore;
pub(crate) mod verification;

use anyhow::Result;
use std::path::Path;

use crate::config::ResolvedConfig;

/// Public entry point for the restore action: validates the archive,
/// recreates the target database from the dump, and installs the filestore
/// under the target name.
pub async fn run_restore_flow(
    config: &ResolvedConfig,
    backup_file: &Path,
    target_db: &str,
) -> Result<()> {
    logic::perform_restore_orchestration(config, backup_file, target_db).await
}
