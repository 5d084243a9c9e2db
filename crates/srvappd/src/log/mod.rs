//! Channel-based log routing.
//!
//! Application code logs to named channels through [`LogRouter`]. Each
//! channel fans out to the sinks registered under it. The built-in sinks are
//! an in-memory [`LogBuffer`], an append-only [`FileSink`] and a
//! [`ConsoleSink`] that re-emits through `tracing`. Non-local messages are
//! additionally queued for an optional [`LogForwarder`].

mod buffer;
mod console;
mod file;
mod forwarder;
mod message;
mod router;
mod sink;

pub use buffer::LogBuffer;
pub use console::ConsoleSink;
pub use file::FileSink;
pub use forwarder::{ForwardError, LogForwarder, UdpForwarder};
pub use message::{LogMessage, LogRecord};
pub use router::{FORWARD_QUEUE_CAPACITY, LogRouter};
pub use sink::{Closeable, FlushInterval, LogSink, SinkError, Toggle};

/// Channel for diagnostic detail.
pub const DEBUG_CHANNEL: &str = "debug";
/// Channel for failures.
pub const ERROR_CHANNEL: &str = "error";
/// Channel for routine operational events.
pub const INFO_CHANNEL: &str = "info";

/// The three channels every server registers at bootstrap.
pub const STANDARD_CHANNELS: [&str; 3] = [DEBUG_CHANNEL, ERROR_CHANNEL, INFO_CHANNEL];

pub(crate) const LOG_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::log");
