mod logic;

use anyhow::Result;

use crate::config::ResolvedConfig;

/// Public entry point for the duplicate action: copies a database and its
/// filestore under a new name without writing an intermediate archive.
pub async fn run_duplicate_flow(
    config: &ResolvedConfig,
    source_db: &str,
    target_db: &str,
) -> Result<()> {
    logic::perform_duplicate_orchestration(config, source_db, target_db).await
}
