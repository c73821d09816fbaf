//! Logging setup: stderr plus an appended plain-text log file.

use crate::config::ConfigError;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::prelude::*;

/// Rotate once the log file reaches this size.
pub const MAX_LOG_BYTES: u64 = 1024 * 1024;

/// Number of rotated files kept next to the live log.
pub const LOG_BACKUPS: usize = 3;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `path` with `.{index}` appended, as produced by [`rotate_if_needed`].
pub(crate) fn backup_path(path: &Path, index: usize) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

/// Shifts `file` to `file.1`, `file.1` to `file.2` and so on when `file`
/// has reached `max_bytes`. The oldest backup beyond `backups` is dropped.
///
/// Only called before the log is opened, so a single long run can push the
/// live file past `max_bytes`; the next run rotates it.
pub fn rotate_if_needed(path: &Path, max_bytes: u64, backups: usize) -> io::Result<()> {
    let size = match fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    if size < max_bytes {
        return Ok(());
    }
    if backups == 0 {
        return fs::remove_file(path);
    }

    let oldest = backup_path(path, backups);
    if oldest.exists() {
        fs::remove_file(&oldest)?;
    }
    for index in (1..backups).rev() {
        let from = backup_path(path, index);
        if from.exists() {
            fs::rename(&from, backup_path(path, index + 1))?;
        }
    }
    fs::rename(path, backup_path(path, 1))
}

/// Installs the global subscriber.
///
/// stderr shows warnings and errors (everything from DEBUG up when
/// `verbose`); the log file records INFO and up (DEBUG when `verbose`).
pub fn init(verbose: bool, log_file: &Path) -> Result<(), ConfigError> {
    let log_error = |e: io::Error| ConfigError::LogFile {
        path: log_file.to_path_buf(),
        source: e,
    };

    if let Some(parent) = log_file.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(log_error)?;
    }
    rotate_if_needed(log_file, MAX_LOG_BYTES, LOG_BACKUPS).map_err(log_error)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .map_err(log_error)?;

    let (console_level, file_level) = if verbose {
        (LevelFilter::DEBUG, LevelFilter::DEBUG)
    } else {
        (LevelFilter::WARN, LevelFilter::INFO)
    };

    let console = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
        .with_filter(console_level);
    let file = tracing_subscriber::fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
        .with_filter(file_level);

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .map_err(|_| ConfigError::LoggingAlreadyInitialised)
}
