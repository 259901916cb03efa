//! Retention sweeper: deletes backup archives and rotated log files older
//! than their configured retention windows. Per-file failures are logged
//! and skipped so one undeletable file never aborts a sweep.

use std::path::Path;
use std::sync::OnceLock;
use std::time::{Duration, SystemTime};

use regex::Regex;
use tracing::{info, warn};

use crate::errors::{AppError, Result};
use crate::logging::LOG_FILE_PREFIX;

fn backup_file_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^backup_.+_\d{4}-\d{2}-\d{2}_\d{2}-\d{2}-\d{2}\.zip$")
            .expect("backup file pattern is valid")
    })
}

fn is_backup_file(name: &str) -> bool {
    backup_file_regex().is_match(name)
}

fn is_rotated_log_file(name: &str) -> bool {
    name.starts_with(LOG_FILE_PREFIX)
}

fn retention_cutoff(retention_days: u32) -> SystemTime {
    SystemTime::now() - Duration::from_secs(u64::from(retention_days) * 86_400)
}

/// Deletes backup archives in `backup_dir` strictly older than the
/// retention window. Returns the number of files deleted.
pub fn sweep_backups(backup_dir: &Path, retention_days: u32) -> Result<usize> {
    if !backup_dir.is_dir() {
        return Ok(0);
    }
    sweep_older_than(backup_dir, is_backup_file, retention_cutoff(retention_days))
}

/// Deletes rotated log files in `log_dir` strictly older than the
/// retention window.
pub fn sweep_logs(log_dir: &Path, retention_days: u32) -> Result<usize> {
    if !log_dir.is_dir() {
        return Ok(0);
    }
    sweep_older_than(log_dir, is_rotated_log_file, retention_cutoff(retention_days))
}

fn sweep_older_than(
    dir: &Path,
    matches: impl Fn(&str) -> bool,
    cutoff: SystemTime,
) -> Result<usize> {
    let mut deleted = 0usize;
    let entries = std::fs::read_dir(dir).map_err(|e| AppError::Filesystem {
        path: dir.to_path_buf(),
        source: e,
    })?;

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable directory entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !matches(name) {
            continue;
        }

        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                warn!("Cannot read modification time of {}: {}", path.display(), e);
                continue;
            }
        };
        if modified >= cutoff {
            continue;
        }

        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!("Deleted old file: {}", path.display());
                deleted += 1;
            }
            Err(e) => {
                warn!("Failed to delete {}: {}", path.display(), e);
            }
        }
    }
    Ok(deleted)
}
