//! Immutable log values shared by every sink.

use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// One formatted log event, created once per logging call.
///
/// Cloning is cheap: channel and text share their storage, so the same
/// message can be handed to many sinks concurrently without copying.
#[derive(Debug, Clone)]
pub struct LogMessage {
    channel: Arc<str>,
    text: Arc<str>,
    location: &'static Location<'static>,
    timestamp: OffsetDateTime,
}

impl LogMessage {
    /// Captures a message for `channel`, recording the caller's location.
    #[track_caller]
    pub fn new(channel: &str, text: impl fmt::Display) -> Self {
        Self::at(channel, text, Location::caller())
    }

    /// Captures a message attributed to an explicit call site.
    pub fn at(channel: &str, text: impl fmt::Display, location: &'static Location<'static>) -> Self {
        Self {
            channel: Arc::from(channel),
            text: Arc::from(text.to_string()),
            location,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    /// Channel the message was dispatched to.
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Fully formatted message text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Source location of the logging call.
    #[must_use]
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    /// UTC capture time.
    #[must_use]
    pub fn timestamp(&self) -> OffsetDateTime {
        self.timestamp
    }

    /// Serialisable projection used by HTTP endpoints and forwarders.
    #[must_use]
    pub fn to_record(&self) -> LogRecord {
        LogRecord {
            channel: self.channel.to_string(),
            text: self.text.to_string(),
            file: self.location.file().to_owned(),
            line: self.location.line(),
            timestamp: self
                .timestamp
                .format(&Rfc3339)
                .unwrap_or_else(|_| self.timestamp.unix_timestamp().to_string()),
        }
    }
}

impl fmt::Display for LogMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}:{} {}",
            self.to_record().timestamp,
            self.channel,
            self.location.file(),
            self.location.line(),
            self.text
        )
    }
}

/// Wire form of a [`LogMessage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogRecord {
    /// Channel the message was dispatched to.
    pub channel: String,
    /// Fully formatted message text.
    pub text: String,
    /// Source file of the logging call.
    pub file: String,
    /// Source line of the logging call.
    pub line: u32,
    /// RFC 3339 capture time.
    pub timestamp: String,
}
