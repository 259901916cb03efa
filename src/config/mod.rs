use std::path::{Path, PathBuf};

use ini::Ini;
use tracing::debug;

use crate::cli::Cli;
use crate::errors::{AppError, Result};

const DEFAULT_DB_USER: &str = "odoo";
const DEFAULT_DB_HOST: &str = "localhost";
const DEFAULT_DB_PORT: u16 = 5432;
const DEFAULT_BACKUP_RETENTION_DAYS: u32 = 7;
const DEFAULT_LOG_RETENTION_DAYS: u32 = 30;
const DEFAULT_LOG_DIR: &str = "./logs";

/// Values read from the Odoo server configuration file (`[options]` section).
/// Every field is optional here; defaults are applied during resolution.
#[derive(Debug, Clone, Default)]
pub struct OdooFileConfig {
    pub db_names: Vec<String>,
    pub data_dir: Option<PathBuf>,
    pub db_user: Option<String>,
    pub db_host: Option<String>,
    pub db_port: Option<String>,
    pub db_password: Option<String>,
    pub admin_passwd: Option<String>,
    pub logfile: Option<PathBuf>,
}

/// Values read from the backup tool configuration file
/// (`[backup]` and optional `[logging]` sections).
#[derive(Debug, Clone, Default)]
pub struct BackupFileConfig {
    pub backup_dir: Option<PathBuf>,
    pub backup_db_names: Vec<String>,
    pub backup_retention_days: Option<String>,
    pub log_dir: Option<PathBuf>,
    pub log_retention_days: Option<String>,
}

/// The single resolved settings object every other component consumes.
/// Built once per invocation, immutable afterwards.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub db_host: String,
    pub db_port: u16,
    pub db_user: String,
    pub db_password: Option<String>,
    pub admin_passwd: Option<String>,
    pub filestore_root: PathBuf,
    pub backup_dir: Option<PathBuf>,
    pub backup_retention_days: u32,
    pub log_dir: PathBuf,
    pub log_retention_days: u32,
    pub db_names: Vec<String>,
    pub include_filestore: bool,
    pub drop_existing: bool,
    pub verbose: bool,
}

pub fn read_odoo_config(path: Option<&Path>) -> Result<OdooFileConfig> {
    let Some(path) = path else {
        return Ok(OdooFileConfig::default());
    };
    if !path.exists() {
        return Err(AppError::Config(format!(
            "Odoo configuration file not found: {}",
            path.display()
        )));
    }
    let ini = Ini::load_from_file(path).map_err(|e| {
        AppError::Config(format!(
            "Failed to parse Odoo configuration file {}: {}",
            path.display(),
            e
        ))
    })?;
    let section = ini.section(Some("options"));
    let get = |key: &str| section.and_then(|s| s.get(key)).map(str::to_string);

    Ok(OdooFileConfig {
        db_names: get("db_name").map(|v| split_db_names(&v)).unwrap_or_default(),
        data_dir: get("data_dir").map(PathBuf::from),
        db_user: get("db_user"),
        db_host: get("db_host"),
        db_port: get("db_port"),
        db_password: get("db_password").filter(|p| !p.is_empty()),
        admin_passwd: get("admin_passwd"),
        logfile: get("logfile").map(PathBuf::from),
    })
}

pub fn read_backup_config(path: Option<&Path>) -> Result<BackupFileConfig> {
    let Some(path) = path else {
        return Ok(BackupFileConfig::default());
    };
    if !path.exists() {
        return Err(AppError::Config(format!(
            "Backup configuration file not found: {}",
            path.display()
        )));
    }
    let ini = Ini::load_from_file(path).map_err(|e| {
        AppError::Config(format!(
            "Failed to parse backup configuration file {}: {}",
            path.display(),
            e
        ))
    })?;
    let backup = ini.section(Some("backup"));
    let logging = ini.section(Some("logging"));

    Ok(BackupFileConfig {
        backup_dir: backup.and_then(|s| s.get("backup_dir")).map(PathBuf::from),
        backup_db_names: backup
            .and_then(|s| s.get("backup_db_names"))
            .map(split_db_names)
            .unwrap_or_default(),
        backup_retention_days: backup
            .and_then(|s| s.get("backup_retention_days"))
            .map(str::to_string),
        log_dir: logging.and_then(|s| s.get("log_dir")).map(PathBuf::from),
        log_retention_days: logging
            .and_then(|s| s.get("log_retention_days"))
            .map(str::to_string),
    })
}

/// Merges both config files and the CLI overrides into a `ResolvedConfig`.
/// Precedence for every overlapping key: CLI > backup config > Odoo config
/// > built-in default.
pub fn resolve(cli: &Cli) -> Result<ResolvedConfig> {
    let odoo = read_odoo_config(cli.overrides.odoo_config.as_deref())?;
    let backup = read_backup_config(cli.overrides.backup_config.as_deref())?;
    resolve_from_parts(cli, odoo, backup)
}

fn resolve_from_parts(
    cli: &Cli,
    odoo: OdooFileConfig,
    backup: BackupFileConfig,
) -> Result<ResolvedConfig> {
    let ov = &cli.overrides;

    let db_port = match &ov.db_port {
        Some(p) => *p,
        None => match &odoo.db_port {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| {
                AppError::Config(format!("Invalid db_port in Odoo configuration: '{}'", raw))
            })?,
            None => DEFAULT_DB_PORT,
        },
    };

    let data_dir = odoo.data_dir.clone().unwrap_or_else(default_data_dir);
    let filestore_root = ov
        .filestore_path
        .clone()
        .unwrap_or_else(|| data_dir.join("filestore"));

    // A single --db-name narrows the list; otherwise the backup config list
    // wins over the Odoo db_name list.
    let db_names = if let Some(name) = &ov.db_name {
        split_db_names(name)
    } else if !backup.backup_db_names.is_empty() {
        backup.backup_db_names.clone()
    } else {
        odoo.db_names.clone()
    };

    let backup_retention_days = match ov.retention_days {
        Some(days) => days,
        None => parse_days(backup.backup_retention_days.as_deref(), "backup_retention_days")?
            .unwrap_or(DEFAULT_BACKUP_RETENTION_DAYS),
    };
    let log_retention_days = match ov.log_retention_days {
        Some(days) => days,
        None => parse_days(backup.log_retention_days.as_deref(), "log_retention_days")?
            .unwrap_or(DEFAULT_LOG_RETENTION_DAYS),
    };

    let log_dir = ov
        .log_dir
        .clone()
        .or(backup.log_dir)
        .or_else(|| odoo.logfile.as_ref().and_then(|f| f.parent().map(Path::to_path_buf)))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR));

    let resolved = ResolvedConfig {
        db_host: ov
            .db_host
            .clone()
            .or(odoo.db_host)
            .unwrap_or_else(|| DEFAULT_DB_HOST.to_string()),
        db_port,
        db_user: ov
            .db_user
            .clone()
            .or(odoo.db_user)
            .unwrap_or_else(|| DEFAULT_DB_USER.to_string()),
        db_password: ov.db_password.clone().or(odoo.db_password),
        admin_passwd: odoo.admin_passwd,
        filestore_root,
        backup_dir: ov.backup_dir.clone().or(backup.backup_dir),
        backup_retention_days,
        log_dir,
        log_retention_days,
        db_names,
        include_filestore: !ov.no_filestore,
        drop_existing: ov.drop_existing,
        verbose: ov.verbose,
    };
    debug!(
        host = %resolved.db_host,
        port = resolved.db_port,
        user = %resolved.db_user,
        filestore_root = %resolved.filestore_root.display(),
        "configuration resolved"
    );
    Ok(resolved)
}

/// Splits a comma-separated database list, trimming entries and dropping
/// duplicates while preserving first-seen order.
pub fn split_db_names(raw: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for name in raw.split(',') {
        let name = name.trim();
        if name.is_empty() || seen.iter().any(|s| s == name) {
            continue;
        }
        seen.push(name.to_string());
    }
    seen
}

fn parse_days(raw: Option<&str>, key: &str) -> Result<Option<u32>> {
    match raw {
        Some(v) => v
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| AppError::Config(format!("Invalid {} value: '{}'", key, v))),
        None => Ok(None),
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Odoo")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().expect("temp file");
        f.write_all(contents.as_bytes()).expect("write config");
        f
    }

    fn parse(args: &[&str]) -> Cli {
        let mut full = vec!["odoo-dbtool"];
        full.extend_from_slice(args);
        Cli::parse_from(full)
    }

    const ODOO_CONF: &str = "\
[options]
db_name = sales_db, crm_db
data_dir = /srv/odoo/data
db_user = odoo_prod
db_host = db.internal
db_port = 5433
db_password = s3cret
admin_passwd = master
logfile = /var/log/odoo/odoo-server.log
";

    const BACKUP_CONF: &str = "\
[backup]
backup_dir = /srv/backups
backup_db_names = sales_db
backup_retention_days = 14

[logging]
log_dir = /var/log/odoo-dbtool
log_retention_days = 10
";

    #[test]
    fn test_defaults_without_config_files() -> anyhow::Result<()> {
        let cli = parse(&["backup"]);
        let resolved = resolve_from_parts(
            &cli,
            OdooFileConfig::default(),
            BackupFileConfig::default(),
        )?;
        assert_eq!(resolved.db_user, "odoo");
        assert_eq!(resolved.db_host, "localhost");
        assert_eq!(resolved.db_port, 5432);
        assert_eq!(resolved.db_password, None);
        assert_eq!(resolved.backup_retention_days, 7);
        assert_eq!(resolved.log_retention_days, 30);
        assert_eq!(resolved.log_dir, PathBuf::from("./logs"));
        assert!(resolved.backup_dir.is_none());
        assert!(resolved.db_names.is_empty());
        assert!(resolved.include_filestore);
        Ok(())
    }

    #[test]
    fn test_odoo_config_is_read() -> anyhow::Result<()> {
        let odoo_file = write_temp(ODOO_CONF);
        let cli = parse(&[
            "backup",
            "--odoo-config",
            odoo_file.path().to_str().unwrap(),
        ]);
        let resolved = resolve(&cli)?;
        assert_eq!(resolved.db_user, "odoo_prod");
        assert_eq!(resolved.db_host, "db.internal");
        assert_eq!(resolved.db_port, 5433);
        assert_eq!(resolved.db_password.as_deref(), Some("s3cret"));
        assert_eq!(resolved.admin_passwd.as_deref(), Some("master"));
        assert_eq!(resolved.db_names, vec!["sales_db", "crm_db"]);
        assert_eq!(
            resolved.filestore_root,
            PathBuf::from("/srv/odoo/data/filestore")
        );
        // log dir falls back to the Odoo logfile's directory
        assert_eq!(resolved.log_dir, PathBuf::from("/var/log/odoo"));
        Ok(())
    }

    #[test]
    fn test_backup_config_takes_precedence_over_odoo_config() -> anyhow::Result<()> {
        let odoo_file = write_temp(ODOO_CONF);
        let backup_file = write_temp(BACKUP_CONF);
        let cli = parse(&[
            "backup",
            "--odoo-config",
            odoo_file.path().to_str().unwrap(),
            "--backup-config",
            backup_file.path().to_str().unwrap(),
        ]);
        let resolved = resolve(&cli)?;
        // backup_db_names beats the Odoo db_name list
        assert_eq!(resolved.db_names, vec!["sales_db"]);
        assert_eq!(resolved.backup_dir, Some(PathBuf::from("/srv/backups")));
        assert_eq!(resolved.backup_retention_days, 14);
        // [logging] log_dir beats the Odoo logfile fallback
        assert_eq!(resolved.log_dir, PathBuf::from("/var/log/odoo-dbtool"));
        assert_eq!(resolved.log_retention_days, 10);
        Ok(())
    }

    #[test]
    fn test_cli_takes_precedence_over_both_files() -> anyhow::Result<()> {
        let odoo_file = write_temp(ODOO_CONF);
        let backup_file = write_temp(BACKUP_CONF);
        let cli = parse(&[
            "backup",
            "--odoo-config",
            odoo_file.path().to_str().unwrap(),
            "--backup-config",
            backup_file.path().to_str().unwrap(),
            "--db-name",
            "staging_db",
            "--db-user",
            "cli_user",
            "--db-host",
            "cli-host",
            "--db-port",
            "6000",
            "--db-password",
            "cli-pass",
            "--filestore-path",
            "/cli/filestore",
            "--backup-dir",
            "/cli/backups",
            "--retention-days",
            "3",
            "--log-dir",
            "/cli/logs",
            "--log-retention-days",
            "2",
        ]);
        let resolved = resolve(&cli)?;
        assert_eq!(resolved.db_names, vec!["staging_db"]);
        assert_eq!(resolved.db_user, "cli_user");
        assert_eq!(resolved.db_host, "cli-host");
        assert_eq!(resolved.db_port, 6000);
        assert_eq!(resolved.db_password.as_deref(), Some("cli-pass"));
        assert_eq!(resolved.filestore_root, PathBuf::from("/cli/filestore"));
        assert_eq!(resolved.backup_dir, Some(PathBuf::from("/cli/backups")));
        assert_eq!(resolved.backup_retention_days, 3);
        assert_eq!(resolved.log_dir, PathBuf::from("/cli/logs"));
        assert_eq!(resolved.log_retention_days, 2);
        Ok(())
    }

    #[test]
    fn test_split_db_names_dedup_preserves_order() {
        assert_eq!(
            split_db_names("sales_db, crm_db,sales_db , ,crm_db,hr_db"),
            vec!["sales_db", "crm_db", "hr_db"]
        );
        assert!(split_db_names("").is_empty());
        assert!(split_db_names(" , ,").is_empty());
    }

    #[test]
    fn test_invalid_port_is_a_config_error() {
        let odoo_file = write_temp("[options]\ndb_port = not-a-port\n");
        let cli = parse(&[
            "backup",
            "--odoo-config",
            odoo_file.path().to_str().unwrap(),
        ]);
        let err = resolve(&cli).unwrap_err();
        assert!(matches!(err, AppError::Config(_)), "got: {err}");
    }

    #[test]
    fn test_missing_config_file_is_a_config_error() {
        let cli = parse(&["backup", "--odoo-config", "/nonexistent/odoo.conf"]);
        let err = resolve(&cli).unwrap_err();
        assert!(matches!(err, AppError::Config(_)), "got: {err}");
    }

    #[test]
    fn test_no_filestore_flag_disables_inclusion() -> anyhow::Result<()> {
        let cli = parse(&["backup", "--no-filestore"]);
        let resolved = resolve_from_parts(
            &cli,
            OdooFileConfig::default(),
            BackupFileConfig::default(),
        )?;
        assert!(!resolved.include_filestore);
        Ok(())
    }
}
