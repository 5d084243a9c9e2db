//! Derives the filesystem locations the runtime writes to.
//!
//! The durable log file lives under the configured log directory. Service
//! registration writes a unit file into the host's unit directory, which is
//! the system-wide directory for root and the per-user directory otherwise,
//! unless overridden in configuration.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::Config;

#[cfg(unix)]
use libc::geteuid;

/// File name of the durable log written by the file sink.
pub const LOG_FILE_NAME: &str = "all.log";

const SYSTEM_UNIT_DIR: &str = "/etc/systemd/system";

/// Canonical paths for artefacts written by the runtime.
#[derive(Debug, Clone)]
pub struct ServicePaths {
    log_dir: PathBuf,
    log_file: PathBuf,
    unit_dir: Option<PathBuf>,
    unit_name: String,
}

impl ServicePaths {
    /// Derives paths from configuration, creating the log directory.
    ///
    /// A missing unit directory is not an error here; only registration
    /// needs one, and it asks through [`ServicePaths::unit_dir`].
    pub fn from_config(config: &Config) -> Result<Self, ServicePathsError> {
        Self::derive(config, default_unit_directory())
    }

    fn derive(config: &Config, fallback_unit_dir: Option<PathBuf>) -> Result<Self, ServicePathsError> {
        let log_dir = config.log_dir().as_std_path().to_path_buf();
        fs::create_dir_all(&log_dir).map_err(|source| ServicePathsError::LogDirectory {
            path: log_dir.clone(),
            source,
        })?;
        let unit_dir = config
            .service_unit_dir()
            .map(|dir| dir.as_std_path().to_path_buf())
            .or(fallback_unit_dir);
        Ok(Self {
            log_file: log_dir.join(LOG_FILE_NAME),
            log_dir,
            unit_dir,
            unit_name: format!("{}.service", config.service_name()),
        })
    }

    /// Directory holding the durable log.
    pub fn log_dir(&self) -> &Path {
        self.log_dir.as_path()
    }

    /// Path of the durable log file.
    pub fn log_file(&self) -> &Path {
        self.log_file.as_path()
    }

    /// Directory the service host reads unit files from.
    pub fn unit_dir(&self) -> Result<&Path, ServicePathsError> {
        self.unit_dir
            .as_deref()
            .ok_or(ServicePathsError::MissingUnitDirectory)
    }

    /// Unit file keyed by the service name.
    pub fn unit_file(&self) -> Result<PathBuf, ServicePathsError> {
        self.unit_dir().map(|dir| dir.join(&self.unit_name))
    }
}

fn default_unit_directory() -> Option<PathBuf> {
    #[cfg(unix)]
    {
        if unsafe { geteuid() } == 0 {
            return Some(PathBuf::from(SYSTEM_UNIT_DIR));
        }
        dirs::config_dir().map(|dir| dir.join("systemd").join("user"))
    }

    #[cfg(not(unix))]
    {
        let _ = SYSTEM_UNIT_DIR;
        None
    }
}

/// Errors raised while deriving runtime paths.
#[derive(Debug, Error)]
pub enum ServicePathsError {
    /// Creating the log directory failed.
    #[error("failed to prepare log directory '{path}': {source}")]
    LogDirectory {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// No unit directory was configured and none could be derived.
    #[error("no service unit directory configured and none could be derived")]
    MissingUnitDirectory,
}
