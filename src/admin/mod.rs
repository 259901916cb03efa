mod logic;

use anyhow::Result;

use crate::config::ResolvedConfig;

/// Public entry point for the create_db action.
pub async fn run_create_flow(config: &ResolvedConfig, db_name: &str) -> Result<()> {
    logic::perform_create_orchestration(config, db_name).await
}

/// Public entry point for the drop_db action.
pub async fn run_drop_flow(config: &ResolvedConfig, db_name: &str) -> Result<()> {
    logic::perform_drop_orchestration(config, db_name).await
}
