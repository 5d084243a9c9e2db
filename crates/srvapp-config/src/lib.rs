//! Shared configuration for the srvapp runtime.
//!
//! Values are layered by [`ortho_config`]: built-in defaults, then a TOML file
//! named by `--config-path` or `SRVAPP_CONFIG_PATH`, then `SRVAPP_*`
//! environment variables, then command-line flags. The daemon loads the
//! configuration exactly once at process entry and passes it down.

mod defaults;
mod logging;
mod run_mode;
mod runtime;

use std::net::SocketAddr;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_HEARTBEAT_INTERVAL_SECS, DEFAULT_HTTP_PORT, DEFAULT_LOG_BUFFER_CAPACITY,
    DEFAULT_LOG_FILTER, DEFAULT_LOG_FLUSH_INTERVAL_SECS, default_http_listen, default_log_dir,
    default_log_filter, default_log_filter_string, default_log_format, default_run_mode,
    default_service_name,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use run_mode::{RunMode, RunModeParseError, SERVICE_RUN_ARGS};
pub use runtime::{LOG_FILE_NAME, ServicePaths, ServicePathsError};

/// Resolved runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "SRVAPP")]
pub struct Config {
    /// `tracing` filter directive applied to diagnostic output.
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Output format of diagnostic events.
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
    /// Directory receiving the durable log file.
    #[ortho_config(default = defaults::default_log_dir())]
    pub log_dir: Utf8PathBuf,
    /// Records retained by the in-memory log buffer.
    #[ortho_config(default = defaults::DEFAULT_LOG_BUFFER_CAPACITY)]
    pub log_buffer_capacity: usize,
    /// Seconds between flushes of the durable log file.
    #[ortho_config(default = defaults::DEFAULT_LOG_FLUSH_INTERVAL_SECS)]
    pub log_flush_interval_secs: u64,
    /// Startup path for this invocation.
    #[ortho_config(default = defaults::default_run_mode())]
    pub run_mode: RunMode,
    /// Name registered with the service host; defaults to the binary name.
    pub service_name: Option<String>,
    /// Overrides the directory service unit files are written to.
    pub service_unit_dir: Option<Utf8PathBuf>,
    /// Address of the private debug listener.
    #[ortho_config(default = defaults::default_http_listen())]
    pub http_listen: SocketAddr,
    /// Address of the optional public static-file listener.
    pub http_public_listen: Option<SocketAddr>,
    /// Root directory served on the public listener.
    pub public_static_dir: Option<Utf8PathBuf>,
    /// Root directory served on the private listener.
    pub private_static_dir: Option<Utf8PathBuf>,
    /// UDP endpoint receiving forwarded log records.
    pub monitor_endpoint: Option<SocketAddr>,
    /// Seconds between heartbeat ticks of the default workload.
    #[ortho_config(default = defaults::DEFAULT_HEARTBEAT_INTERVAL_SECS)]
    pub heartbeat_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            log_dir: default_log_dir(),
            log_buffer_capacity: DEFAULT_LOG_BUFFER_CAPACITY,
            log_flush_interval_secs: DEFAULT_LOG_FLUSH_INTERVAL_SECS,
            run_mode: default_run_mode(),
            service_name: None,
            service_unit_dir: None,
            http_listen: default_http_listen(),
            http_public_listen: None,
            public_static_dir: None,
            private_static_dir: None,
            monitor_endpoint: None,
            heartbeat_interval_secs: DEFAULT_HEARTBEAT_INTERVAL_SECS,
        }
    }
}

impl Config {
    /// Filter directive for the diagnostic subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Output format of diagnostic events.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Directory receiving the durable log file.
    #[must_use]
    pub fn log_dir(&self) -> &Utf8Path {
        &self.log_dir
    }

    /// Records retained by the in-memory log buffer (at least one).
    #[must_use]
    pub fn log_buffer_capacity(&self) -> usize {
        self.log_buffer_capacity.max(1)
    }

    /// Interval between flushes of the durable log file.
    #[must_use]
    pub const fn log_flush_interval(&self) -> Duration {
        Duration::from_secs(self.log_flush_interval_secs)
    }

    /// Startup path for this invocation.
    #[must_use]
    pub const fn run_mode(&self) -> RunMode {
        self.run_mode
    }

    /// Name registered with the service host.
    #[must_use]
    pub fn service_name(&self) -> &str {
        self.service_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(default_service_name())
    }

    /// Configured unit directory override, if any.
    #[must_use]
    pub fn service_unit_dir(&self) -> Option<&Utf8Path> {
        self.service_unit_dir.as_deref()
    }

    /// Address of the private debug listener.
    #[must_use]
    pub const fn http_listen(&self) -> SocketAddr {
        self.http_listen
    }

    /// Address of the public static-file listener, if enabled.
    #[must_use]
    pub const fn http_public_listen(&self) -> Option<SocketAddr> {
        self.http_public_listen
    }

    /// Root directory served on the public listener.
    #[must_use]
    pub fn public_static_dir(&self) -> Option<&Utf8Path> {
        self.public_static_dir.as_deref()
    }

    /// Root directory served on the private listener.
    #[must_use]
    pub fn private_static_dir(&self) -> Option<&Utf8Path> {
        self.private_static_dir.as_deref()
    }

    /// UDP endpoint receiving forwarded log records.
    #[must_use]
    pub const fn monitor_endpoint(&self) -> Option<SocketAddr> {
        self.monitor_endpoint
    }

    /// Interval between heartbeat ticks of the default workload.
    #[must_use]
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs.max(1))
    }
}
