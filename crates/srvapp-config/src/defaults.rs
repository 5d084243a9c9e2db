use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use camino::Utf8PathBuf;

use crate::logging::LogFormat;
use crate::run_mode::RunMode;

/// Default TCP port of the private debug listener.
pub const DEFAULT_HTTP_PORT: u16 = 9780;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Number of log records retained by the in-memory buffer sink.
pub const DEFAULT_LOG_BUFFER_CAPACITY: usize = 100;

/// Seconds between flushes of the buffered log file.
pub const DEFAULT_LOG_FLUSH_INTERVAL_SECS: u64 = 5;

/// Seconds between heartbeat ticks of the default workload.
pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 30;

/// Default log filter expression used by the binaries.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default output format for diagnostic events.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Directory receiving the durable log file, relative to the working directory.
#[must_use]
pub fn default_log_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("logs")
}

/// Run mode applied when none is requested.
#[must_use]
pub fn default_run_mode() -> RunMode {
    RunMode::Interactive
}

/// Loopback address of the private debug listener.
#[must_use]
pub fn default_http_listen() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_HTTP_PORT)
}

/// Name under which the binary registers with the service host.
#[must_use]
pub fn default_service_name() -> &'static str {
    "srvappd"
}
