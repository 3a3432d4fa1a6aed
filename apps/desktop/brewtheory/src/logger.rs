//! Logging for the BrewTheory backend.
//!
//! Provides dual output (stderr with colors + file) with thread-safe initialization.
//! Stdout is reserved for the `SERVICE_READY` line the front-end waits for.

use crate::error::BackendError;

use common::ErrorLocation;

use std::fs::create_dir_all;
use std::io::stderr;
use std::panic::Location;
use std::path::Path;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use fern::Dispatch;
use fern::colors::Color::{Blue, Green, Magenta, Red, Yellow};
use fern::colors::ColoredLevelConfig;
use humantime::format_rfc3339;
use log::{LevelFilter, info, warn};

/// Thread-safe initialization guard.
static INIT_LOGGER_ONCE: Once = Once::new();

/// Tracks if logger initialization was already attempted.
static LOGGER_ALREADY_CALLED: AtomicBool = AtomicBool::new(false);

const LOGGER_INITIALIZED_MESSAGE_PREFIX: &str = "Logger initialized with level: ";

const LOGGER_ALREADY_INITIALIZED_MESSAGE: &str = "Logger already initialized";

/// Initialize the logger with dual output (stderr + `log_file`).
///
/// Safe to call multiple times: later calls log a warning and return Ok.
///
/// # Errors
///
/// Returns [`BackendError::Logger`] if the log file cannot be created or a
/// global logger is already installed.
pub fn initialize(log_file: &Path, level: LevelFilter) -> Result<(), BackendError> {
    if LOGGER_ALREADY_CALLED.swap(true, Ordering::SeqCst) {
        warn!("{LOGGER_ALREADY_INITIALIZED_MESSAGE}");
        return Ok(());
    }

    let mut result = Ok(());

    INIT_LOGGER_ONCE.call_once(|| {
        result = build_dispatch(log_file, level).and_then(|dispatch| {
            dispatch.apply().map_err(|e| BackendError::Logger {
                message: format!("Failed to initialize logger: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })
        });
        if result.is_ok() {
            info!("{LOGGER_INITIALIZED_MESSAGE_PREFIX}{level:?}");
            info!("Log file: {}", log_file.display());
        }
    });

    result
}

/// Builds the stderr and file chains without installing them.
#[track_caller]
pub(crate) fn build_dispatch(log_file: &Path, level: LevelFilter) -> Result<Dispatch, BackendError> {
    if let Some(dir) = log_file.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        create_dir_all(dir).map_err(|e| BackendError::Logger {
            message: format!("Failed to create log directory {}: {e}", dir.display()),
            location: ErrorLocation::from(Location::caller()),
        })?;
    }

    let color_configuration = ColoredLevelConfig::new()
        .debug(Blue)
        .info(Green)
        .warn(Yellow)
        .error(Red)
        .trace(Magenta);

    let console_dispatch = Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{date} - {level}] {message} [{file}:{line}]",
                date = format_rfc3339(SystemTime::now()),
                level = color_configuration.color(record.level()),
                message = message,
                file = record.file().unwrap_or("unknown"),
                line = record.line().unwrap_or(0),
            ))
        })
        .chain(stderr());

    let file_dispatch = Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{date} - {level}] {message} [{file}:{line}]",
                date = format_rfc3339(SystemTime::now()),
                level = record.level(),
                message = message,
                file = record.file().unwrap_or("unknown"),
                line = record.line().unwrap_or(0)
            ))
        })
        .chain(fern::log_file(log_file).map_err(|e| BackendError::Logger {
            message: format!("Failed to create log file {}: {e}", log_file.display()),
            location: ErrorLocation::from(Location::caller()),
        })?);

    Ok(Dispatch::new()
        .level(level)
        .chain(console_dispatch)
        .chain(file_dispatch))
}
