//! RPC server configuration.
//!
//! The front-end launches the backend with command-line flags only, so this is
//! a plain value built by the binary. The certificate directory can be
//! redirected through `BREWTHEORY_CONFIG_DIR` (read from the process
//! environment or a `.env` file), which keeps tests and side-by-side installs
//! away from the user's real config directory.

use crate::error::config::ConfigError;

use common::ErrorLocation;

use std::env;
use std::panic::Location;
use std::path::PathBuf;
use std::time::Duration;

use log::{debug, info};

pub const DEFAULT_LISTEN_HOST: &str = "localhost";
pub const DEFAULT_LISTEN_PORT: u16 = 53017;
pub const DEFAULT_LISTEN_ADDRESS: &str =
    const_format::concatcp!(DEFAULT_LISTEN_HOST, ":", DEFAULT_LISTEN_PORT);

/// Vendor and application folders under the platform config directory.
pub const CONFIG_VENDOR_DIR: &str = "farrcraft";
pub const CONFIG_APP_DIR: &str = "BrewTheory";
pub const CERTIFICATE_FILE_NAME: &str = "certificate";
pub const CONFIG_DIR_ENV_VAR: &str = "BREWTHEORY_CONFIG_DIR";

const DEFAULT_REORDER_WINDOW: Duration = Duration::from_secs(2);
const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_address: String,

    /// Directory the certificate PEM is written to. `None` resolves to the
    /// platform config directory.
    pub certificate_dir: Option<PathBuf>,

    /// How long an early request waits for its predecessor on the same session.
    pub reorder_window: Duration,

    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: String::from(DEFAULT_LISTEN_ADDRESS),
            certificate_dir: None,
            reorder_window: DEFAULT_REORDER_WINDOW,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ServerConfig {
    pub fn with_listen_address(mut self, address: impl Into<String>) -> Self {
        self.listen_address = address.into();
        self
    }

    pub fn with_certificate_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.certificate_dir = Some(dir.into());
        self
    }

    pub fn with_reorder_window(mut self, window: Duration) -> Self {
        self.reorder_window = window;
        self
    }

    /// Applies `BREWTHEORY_CONFIG_DIR` if set and no directory was configured.
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            debug!("Loaded environment from {}", path.display());
        }

        if self.certificate_dir.is_some() {
            return self;
        }

        match env::var(CONFIG_DIR_ENV_VAR) {
            Ok(dir) if !dir.is_empty() => {
                info!("Using {CONFIG_DIR_ENV_VAR} override: {dir}");
                self.certificate_dir = Some(PathBuf::from(dir));
            }
            _ => {}
        }

        self
    }

    /// Directory the certificate is persisted to.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DirectoryNotFound`] when no directory is
    /// configured and the platform has no config directory.
    pub fn certificate_dir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(ref dir) = self.certificate_dir {
            return Ok(dir.clone());
        }

        dirs::config_dir()
            .map(|base| base.join(CONFIG_VENDOR_DIR).join(CONFIG_APP_DIR))
            .ok_or_else(|| ConfigError::DirectoryNotFound {
                message: String::from("Platform has no user config directory"),
                location: ErrorLocation::from(Location::caller()),
            })
    }

    pub fn certificate_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.certificate_dir()?.join(CERTIFICATE_FILE_NAME))
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listen_address.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: String::from("listen_address cannot be empty"),
            });
        }

        if self.max_body_bytes == 0 {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: String::from("max_body_bytes must be greater than zero"),
            });
        }

        Ok(())
    }
}
