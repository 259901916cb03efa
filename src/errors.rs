use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("pg_dump failed for database '{db}': {output}")]
    Dump { db: String, output: String },

    #[error("Restore failed for database '{db}': {output}")]
    Restore { db: String, output: String },

    #[error("Failed to create database '{db}': {output}")]
    Create { db: String, output: String },

    #[error("Failed to drop database '{db}': {output}")]
    Drop { db: String, output: String },

    #[error("Corrupt or unreadable backup archive {}: {reason}", .archive.display())]
    CorruptArchive { archive: PathBuf, reason: String },

    #[error("Filesystem operation failed on {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

pub type Result<T> = std::result::Result<T, AppError>;
