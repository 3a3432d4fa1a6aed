//! Command-line flags the front-end launches the backend with.

use crate::error::BackendError;

use common::ErrorLocation;

use rpc_core::config::{DEFAULT_LISTEN_ADDRESS, ServerConfig};

use std::panic::Location;
use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use log::LevelFilter;

pub const DEFAULT_LOG_FILE: &str = "brewtheory.log";
pub const DEFAULT_LOG_LEVEL: &str = "DEBUG";

#[derive(Debug, Clone, Parser)]
#[command(name = "brewtheory", version, about = "BrewTheory backend service")]
pub struct Args {
    /// Log file path
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    pub logfile: PathBuf,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR, OFF)
    #[arg(long, default_value = DEFAULT_LOG_LEVEL)]
    pub loglevel: String,

    /// Listen address for the RPC server
    #[arg(long, default_value = DEFAULT_LISTEN_ADDRESS)]
    pub listen: String,
}

impl Args {
    /// Parses `--loglevel`, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Argument`] for an unknown level name.
    pub fn log_level(&self) -> Result<LevelFilter, BackendError> {
        LevelFilter::from_str(self.loglevel.trim()).map_err(|e| BackendError::Argument {
            message: format!("Invalid log level '{}': {e}", self.loglevel),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    /// Server configuration for these flags, with environment overrides applied.
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig::default()
            .with_listen_address(self.listen.as_str())
            .apply_env_overrides()
    }
}
