mod logic;
pub(crate) mod db_dump;

use anyhow::Result;

use crate::config::ResolvedConfig;

/// Public entry point for the backup action. Backs up every resolved
/// database into its own ZIP archive, then sweeps old backups.
pub async fn run_backup_flow(config: &ResolvedConfig) -> Result<()> {
    logic::perform_backup_orchestration(config).await
}
