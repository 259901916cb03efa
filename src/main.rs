//! Odoo Database Lifecycle Tool
//!
//! Backup, restore, duplication, creation, and deletion of Odoo databases
//! together with their filestore directories.

mod admin;
mod archive;
mod backup;
mod cli;
mod config;
mod duplicate;
mod errors;
mod filestore;
mod logging;
mod restore;
mod retention;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use tracing::{error, warn};

use cli::{Action, Cli};
use errors::AppError;

#[tokio::main]
async fn main() -> ExitCode {
    match run_app().await {
        Ok(_) => {
            println!("✓ Operation completed successfully.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Operation failed: {:?}", e);
            eprintln!("Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_app() -> Result<()> {
    let cli = Cli::parse();
    let config = config::resolve(&cli).context("Failed to resolve configuration")?;

    let _log_guard = logging::init(&config).context("Failed to initialize logging")?;
    if let Err(e) = retention::sweep_logs(&config.log_dir, config.log_retention_days) {
        warn!("Log retention sweep failed: {:?}", e);
    }

    match cli.action {
        Action::Backup => backup::run_backup_flow(&config)
            .await
            .context("Backup process failed")?,
        Action::Restore => {
            let backup_file = require_flag(cli.overrides.backup_file.clone(), "restore", "--backup-file")?;
            let target_db = require_flag(cli.overrides.db_name.clone(), "restore", "--db-name")?;
            restore::run_restore_flow(&config, &backup_file, &target_db)
                .await
                .context("Restore process failed")?;
        }
        Action::Duplicate => {
            let source_db = require_flag(cli.overrides.source_db.clone(), "duplicate", "--source-db")?;
            let target_db = require_flag(cli.overrides.db_name.clone(), "duplicate", "--db-name")?;
            duplicate::run_duplicate_flow(&config, &source_db, &target_db)
                .await
                .context("Duplicate process failed")?;
        }
        Action::DropDb => {
            let db_name = require_flag(cli.overrides.db_name.clone(), "drop_db", "--db-name")?;
            admin::run_drop_flow(&config, &db_name)
                .await
                .context("Drop process failed")?;
        }
        Action::CreateDb => {
            let db_name = require_flag(cli.overrides.db_name.clone(), "create_db", "--db-name")?;
            admin::run_create_flow(&config, &db_name)
                .await
                .context("Create process failed")?;
        }
    }
    Ok(())
}

/// Per-action pre-flight check: a missing required flag is a fatal
/// configuration error raised before any destructive work begins.
fn require_flag<T>(value: Option<T>, action: &str, flag: &str) -> Result<T> {
    value.ok_or_else(|| {
        AppError::Config(format!("{} is required for the {} action", flag, action)).into()
    })
}
