//! Log manager: rotating file + console output via tracing, and isolation
//! of subprocess chatter into per-invocation scratch files that only reach
//! the main log when the subprocess fails.

use std::fs;
use std::process::{Command, ExitStatus, Stdio};

use anyhow::{Context, Result};
use tracing::{debug, error};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ResolvedConfig;

/// Prefix of the rotating log files. Daily rotation appends the date, so
/// rotated files look like `odoo-dbtool.log.2026-08-06`.
pub const LOG_FILE_PREFIX: &str = "odoo-dbtool.log";

/// Keeps the non-blocking file writer alive; dropping it flushes pending
/// log lines, so hold it for the lifetime of the process.
pub struct LogGuard {
    _file_guard: WorkerGuard,
}

/// Initialize the tracing subscriber with a console layer and a rotating
/// file layer under `config.log_dir`. Takes the resolved settings as an
/// explicit dependency; nothing here reads ambient global state.
pub fn init(config: &ResolvedConfig) -> Result<LogGuard> {
    fs::create_dir_all(&config.log_dir).with_context(|| {
        format!("Failed to create log directory: {}", config.log_dir.display())
    })?;

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_PREFIX);
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if config.verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(file_writer),
        )
        .init();

    Ok(LogGuard {
        _file_guard: file_guard,
    })
}

/// Result of a subprocess run through [`run_captured`]. `output` is empty
/// on success; on failure it holds everything the process wrote.
pub struct SubprocessResult {
    pub status: ExitStatus,
    pub output: String,
}

impl SubprocessResult {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Runs a command with stdout and stderr redirected into a private
/// temporary file. On success the file is discarded (its path only shows up
/// at debug level); on failure its full contents are appended to the main
/// log and returned so the caller can fold them into a typed error.
pub fn run_captured(label: &str, cmd: &mut Command) -> Result<SubprocessResult> {
    let capture = tempfile::NamedTempFile::new()
        .context("Failed to create scratch file for subprocess output")?;
    let stdout_handle = capture
        .reopen()
        .context("Failed to reopen subprocess scratch file")?;
    let stderr_handle = capture
        .reopen()
        .context("Failed to reopen subprocess scratch file")?;

    debug!(
        "running {}: {:?} (output captured at {})",
        label,
        cmd.get_program(),
        capture.path().display()
    );

    let status = cmd
        .stdout(Stdio::from(stdout_handle))
        .stderr(Stdio::from(stderr_handle))
        .status()
        .with_context(|| format!("Failed to execute {}", label))?;

    if status.success() {
        return Ok(SubprocessResult {
            status,
            output: String::new(),
        });
    }

    let output = fs::read_to_string(capture.path()).unwrap_or_default();
    error!(
        "{} failed with {}; captured output follows\n{}",
        label,
        status,
        output.trim_end()
    );
    Ok(SubprocessResult { status, output })
}
