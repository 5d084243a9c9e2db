//! Sink that re-emits routed messages through the `tracing` subscriber.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, error, info};

use super::message::LogMessage;
use super::sink::{LogSink, Toggle};
use super::{DEBUG_CHANNEL, ERROR_CHANNEL};

const CONSOLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::console");

/// Console output for routed channels.
///
/// `error` maps to ERROR, `debug` to DEBUG and every other channel to INFO,
/// so the subscriber's filter decides what reaches the terminal.
#[derive(Debug)]
pub struct ConsoleSink {
    enabled: AtomicBool,
}

impl ConsoleSink {
    /// Creates an enabled console sink.
    #[must_use]
    pub fn new() -> Self {
        Self {
            enabled: AtomicBool::new(true),
        }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    fn print(&self, message: &LogMessage) {
        if !self.enabled.load(Ordering::Acquire) {
            return;
        }
        let channel = message.channel();
        let file = message.location().file();
        let line = message.location().line();
        match channel {
            ERROR_CHANNEL => error!(target: CONSOLE_TARGET, channel, file, line, "{}", message.text()),
            DEBUG_CHANNEL => debug!(target: CONSOLE_TARGET, channel, file, line, "{}", message.text()),
            _ => info!(target: CONSOLE_TARGET, channel, file, line, "{}", message.text()),
        }
    }

    fn toggle(&self) -> Option<&dyn Toggle> {
        Some(self)
    }
}

impl Toggle for ConsoleSink {
    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}
