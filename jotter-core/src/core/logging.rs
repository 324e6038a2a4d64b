//! File logging bootstrap.
//!
//! The core only emits through the `log` facade. The host application calls
//! [`init_logging`] once at startup to route those records to a rotating file.

use crate::{JotterError, Result};
use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::info;
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "jotter";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 5 * 1024 * 1024;
const MAX_LOG_FILES: usize = 3;

static LOGGING_STATE: OnceCell<LoggingState> = OnceCell::new();

struct LoggingState {
    level: &'static str,
    log_dir: PathBuf,
    _handle: LoggerHandle,
}

/// Starts the rotating file logger in `log_dir` at `level`.
///
/// Calling it again with the same directory and level is a no-op.
///
/// # Errors
///
/// Returns [`JotterError::Io`] if the directory cannot be created, and
/// [`JotterError::Logging`] if `level` is unknown, the logger is already
/// running with other settings, or the backend fails to start.
pub fn init_logging<P: AsRef<Path>>(level: &str, log_dir: P) -> Result<()> {
    let level = normalize_level(level)?;
    let log_dir = log_dir.as_ref().to_path_buf();

    let state = LOGGING_STATE.get_or_try_init(|| start_logger(level, &log_dir))?;

    if state.log_dir != log_dir {
        return Err(JotterError::Logging(format!(
            "already logging to `{}`; refusing to switch to `{}`",
            state.log_dir.display(),
            log_dir.display()
        )));
    }
    if state.level != level {
        return Err(JotterError::Logging(format!(
            "already logging at `{}`; refusing to switch to `{level}`",
            state.level
        )));
    }
    Ok(())
}

/// Returns `(level, directory)` of the running logger, if any.
pub fn logging_status() -> Option<(&'static str, PathBuf)> {
    LOGGING_STATE
        .get()
        .map(|state| (state.level, state.log_dir.clone()))
}

/// `debug` in debug builds, `info` in release builds.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start_logger(level: &'static str, log_dir: &Path) -> Result<LoggingState> {
    std::fs::create_dir_all(log_dir)?;

    let handle = Logger::try_with_str(level)
        .map_err(|e| JotterError::Logging(format!("invalid log level `{level}`: {e}")))?
        .log_to_file(
            FileSpec::default()
                .directory(log_dir)
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(MAX_LOG_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|e| JotterError::Logging(format!("failed to start logger: {e}")))?;

    info!(
        "event=app_start module=logging status=ok level={level} version={}",
        env!("CARGO_PKG_VERSION")
    );

    Ok(LoggingState {
        level,
        log_dir: log_dir.to_path_buf(),
        _handle: handle,
    })
}

fn normalize_level(level: &str) -> Result<&'static str> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(JotterError::Logging(format!(
            "unsupported log level `{other}`; expected trace|debug|info|warn|error"
        ))),
    }
}
