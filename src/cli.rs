use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Lifecycle management for Odoo databases and their filestores.
#[derive(Debug, Parser)]
#[command(name = "odoo-dbtool", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub action: Action,

    #[command(flatten)]
    pub overrides: Overrides,
}

#[derive(Debug, Subcommand)]
pub enum Action {
    /// Back up one or more databases with their filestores into ZIP archives
    Backup,
    /// Restore a backup archive into a (possibly new) database
    Restore,
    /// Duplicate a database and its filestore under a new name
    Duplicate,
    /// Drop a database and remove its filestore
    #[command(name = "drop_db")]
    DropDb,
    /// Create a new empty database and filestore directory
    #[command(name = "create_db")]
    CreateDb,
}

/// Flags overriding values from the config files. Precedence is
/// CLI > backup config > Odoo config > built-in default.
#[derive(Debug, clap::Args)]
pub struct Overrides {
    /// Path to the Odoo server configuration file
    #[arg(long, global = true, value_name = "FILE")]
    pub odoo_config: Option<PathBuf>,

    /// Path to the backup tool configuration file
    #[arg(long, global = true, value_name = "FILE")]
    pub backup_config: Option<PathBuf>,

    /// Target database name (restore, duplicate, drop_db, create_db) or a
    /// single database to back up
    #[arg(long, global = true, value_name = "NAME")]
    pub db_name: Option<String>,

    /// Source database name (duplicate)
    #[arg(long, global = true, value_name = "NAME")]
    pub source_db: Option<String>,

    /// Root of the Odoo filestore directory
    #[arg(long, global = true, value_name = "DIR")]
    pub filestore_path: Option<PathBuf>,

    /// Directory where backup archives are written
    #[arg(long, global = true, value_name = "DIR")]
    pub backup_dir: Option<PathBuf>,

    /// Backup ZIP archive to restore from
    #[arg(long, global = true, value_name = "FILE")]
    pub backup_file: Option<PathBuf>,

    /// PostgreSQL user
    #[arg(long, global = true, value_name = "USER")]
    pub db_user: Option<String>,

    /// PostgreSQL host
    #[arg(long, global = true, value_name = "HOST")]
    pub db_host: Option<String>,

    /// PostgreSQL port
    #[arg(long, global = true, value_name = "PORT")]
    pub db_port: Option<u16>,

    /// PostgreSQL password (passed to utilities via PGPASSWORD, never argv)
    #[arg(long, global = true, value_name = "PASSWORD")]
    pub db_password: Option<String>,

    /// Drop an existing target database before restoring or duplicating
    #[arg(long, global = true)]
    pub drop_existing: bool,

    /// Days to retain backup archives
    #[arg(long, global = true, value_name = "DAYS")]
    pub retention_days: Option<u32>,

    /// Skip the filestore when backing up or restoring
    #[arg(long, global = true)]
    pub no_filestore: bool,

    /// Directory for the tool's own log files
    #[arg(long, global = true, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Days to retain rotated log files
    #[arg(long, global = true, value_name = "DAYS")]
    pub log_retention_days: Option<u32>,

    /// Verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}
