//! Log destinations and their optional capabilities.
//!
//! Every sink prints. Closing, toggling and flush-interval tuning are
//! optional: a sink advertises them by overriding the matching accessor, and
//! the router checks the accessor before each administrative call. Sinks that
//! do not advertise a capability are skipped.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use super::message::LogMessage;

/// Destination for routed log messages.
///
/// `print` runs on the dispatching thread while the router holds its shared
/// lock, so implementations must be quick and must not call back into the
/// router.
pub trait LogSink: Send + Sync {
    /// Short label used in diagnostics.
    fn name(&self) -> &str;

    /// Records one message.
    fn print(&self, message: &LogMessage);

    /// Close capability, if supported.
    fn closer(&self) -> Option<&dyn Closeable> {
        None
    }

    /// Enable/disable capability, if supported.
    fn toggle(&self) -> Option<&dyn Toggle> {
        None
    }

    /// Flush interval capability, if supported.
    fn flush_control(&self) -> Option<&dyn FlushInterval> {
        None
    }
}

/// Sinks holding resources that must be released at shutdown.
pub trait Closeable {
    /// Flushes and releases the sink's resources.
    fn close(&self) -> Result<(), SinkError>;
}

/// Sinks that can be muted without being unregistered.
pub trait Toggle {
    /// Enables or disables recording.
    fn set_enabled(&self, enabled: bool);

    /// Reports whether the sink currently records messages.
    fn is_enabled(&self) -> bool;
}

/// Sinks that buffer output and flush periodically.
pub trait FlushInterval {
    /// Sets the maximum time buffered output may wait before a flush.
    fn set_flush_interval(&self, interval: Duration);
}

/// Errors raised by sink lifecycle operations.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Opening the sink's backing file failed.
    #[error("failed to open log file '{path}': {source}")]
    Open {
        /// File that could not be opened.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The background flusher could not be started.
    #[error("failed to start flusher for '{path}': {source}")]
    Flusher {
        /// File the flusher would serve.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Flushing buffered output failed.
    #[error("failed to flush sink '{sink}': {source}")]
    Flush {
        /// Sink that failed.
        sink: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}
