pub mod setting;

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use which::which;

use crate::config::ResolvedConfig;
use crate::errors::AppError;

/// Finds a PostgreSQL client executable in the system PATH.
pub fn find_executable(name: &str) -> Result<PathBuf> {
    which(name).with_context(|| {
        format!(
            "{} executable not found in PATH. Please ensure PostgreSQL client tools are installed and in your PATH.",
            name
        )
    })
}

/// Rejects database names that could not have come from Odoo and would be
/// unsafe to hand to external utilities.
pub fn validate_db_name(name: &str) -> std::result::Result<(), AppError> {
    if name.trim().is_empty()
        || name
            .chars()
            .any(|c| !c.is_alphanumeric() && c != '_' && c != '-')
    {
        return Err(AppError::Config(format!(
            "Invalid database name: '{}'",
            name
        )));
    }
    Ok(())
}

/// Builds a command for a PostgreSQL client utility with the resolved
/// connection arguments. The password travels only through PGPASSWORD,
/// never through the argument list.
pub fn pg_command(executable: &Path, config: &ResolvedConfig) -> Command {
    let mut cmd = Command::new(executable);
    cmd.args(["-U", &config.db_user])
        .args(["-h", &config.db_host])
        .args(["-p", &config.db_port.to_string()]);
    if let Some(password) = &config.db_password {
        cmd.env("PGPASSWORD", password);
    }
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_db_name() {
        assert!(validate_db_name("sales_db").is_ok());
        assert!(validate_db_name("sales-db-2026").is_ok());
        assert!(validate_db_name("").is_err());
        assert!(validate_db_name("  ").is_err());
        assert!(validate_db_name("db;drop table").is_err());
        assert!(validate_db_name("db name").is_err());
        assert!(validate_db_name("db/../etc").is_err());
    }
}
