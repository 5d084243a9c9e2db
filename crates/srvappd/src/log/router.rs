//! Channel-to-sink fan-out.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::panic::Location;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};
use std::time::Duration;

use tracing::error;

use super::forwarder::{ForwardQueue, LogForwarder};
use super::message::LogMessage;
use super::sink::LogSink;
use super::{DEBUG_CHANNEL, ERROR_CHANNEL, INFO_CHANNEL, LOG_TARGET};

/// Queue depth between dispatching threads and the telemetry forwarder.
pub const FORWARD_QUEUE_CAPACITY: usize = 1024;

#[derive(Default)]
struct Registry {
    channels: HashMap<String, Vec<Arc<dyn LogSink>>>,
    // Each distinct sink once, in first-registration order.
    sinks: Vec<Arc<dyn LogSink>>,
}

/// Distributes log messages to the sinks registered under each channel.
///
/// Dispatch holds the registry's read lock while it prints, so each message
/// reaches every sink registered at that moment as one step. Registration
/// takes the write lock and is expected during startup only.
pub struct LogRouter {
    registry: RwLock<Registry>,
    forwarder: Option<ForwardQueue>,
}

impl LogRouter {
    /// Creates a router without a telemetry forwarder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            forwarder: None,
        }
    }

    /// Creates a router that hands non-local messages to `forwarder`.
    pub fn with_forwarder(forwarder: Arc<dyn LogForwarder>) -> Result<Self, io::Error> {
        Ok(Self {
            registry: RwLock::new(Registry::default()),
            forwarder: Some(ForwardQueue::spawn(forwarder, FORWARD_QUEUE_CAPACITY)?),
        })
    }

    /// Appends `sink` to `channel`. Registering twice delivers twice.
    pub fn register(&self, channel: &str, sink: Arc<dyn LogSink>) {
        let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
        if !registry.sinks.iter().any(|known| Arc::ptr_eq(known, &sink)) {
            registry.sinks.push(Arc::clone(&sink));
        }
        registry
            .channels
            .entry(channel.to_owned())
            .or_default()
            .push(sink);
    }

    /// Channels with at least one sink, sorted by name.
    #[must_use]
    pub fn channels(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().channels.keys().cloned().collect();
        names.sort();
        names
    }

    /// Formats and delivers a message to every sink under `channel`.
    ///
    /// Unless `local` is set, the message is also queued for the telemetry
    /// forwarder. A channel without sinks is reported on the error channel.
    #[track_caller]
    pub fn log_to(&self, local: bool, channel: &str, text: impl fmt::Display) {
        let message = LogMessage::at(channel, text, Location::caller());
        self.dispatch(&message, local);
    }

    /// Delivers an already captured message.
    pub fn dispatch(&self, message: &LogMessage, local: bool) {
        if !local {
            if let Some(forwarder) = &self.forwarder {
                forwarder.submit(message);
            }
        }

        {
            let registry = self.read();
            if let Some(sinks) = registry.channels.get(message.channel()) {
                for sink in sinks {
                    sink.print(message);
                }
                return;
            }
        }

        let channel = message.channel();
        self.report_missing(
            channel,
            format_args!("Couldn't log to {channel} logs. Loggers missing."),
        );
    }

    /// Logs to `debug` and forwards.
    #[track_caller]
    pub fn debug(&self, text: impl fmt::Display) {
        self.log_to(false, DEBUG_CHANNEL, text);
    }

    /// Logs to `info` and forwards.
    #[track_caller]
    pub fn info(&self, text: impl fmt::Display) {
        self.log_to(false, INFO_CHANNEL, text);
    }

    /// Logs to `error` and forwards.
    #[track_caller]
    pub fn error(&self, text: impl fmt::Display) {
        self.log_to(false, ERROR_CHANNEL, text);
    }

    /// Logs to `debug` without forwarding.
    #[track_caller]
    pub fn debug_local(&self, text: impl fmt::Display) {
        self.log_to(true, DEBUG_CHANNEL, text);
    }

    /// Logs to `info` without forwarding.
    #[track_caller]
    pub fn info_local(&self, text: impl fmt::Display) {
        self.log_to(true, INFO_CHANNEL, text);
    }

    /// Logs to `error` without forwarding.
    #[track_caller]
    pub fn error_local(&self, text: impl fmt::Display) {
        self.log_to(true, ERROR_CHANNEL, text);
    }

    /// Enables or disables every toggleable sink under `channel`.
    pub fn set_enabled(&self, channel: &str, enabled: bool) {
        let found = {
            let registry = self.read();
            registry.channels.get(channel).map(|sinks| {
                sinks
                    .iter()
                    .filter_map(|sink| sink.toggle())
                    .for_each(|toggle| toggle.set_enabled(enabled));
            })
        };
        if found.is_none() {
            self.report_missing(
                channel,
                format_args!("Couldn't set enabled ({enabled}) on {channel} logs. Loggers missing"),
            );
        }
    }

    /// Sets the flush interval of every interval-tunable sink under `channel`.
    pub fn set_flush_interval(&self, channel: &str, interval: Duration) {
        let found = {
            let registry = self.read();
            registry.channels.get(channel).map(|sinks| {
                sinks
                    .iter()
                    .filter_map(|sink| sink.flush_control())
                    .for_each(|control| control.set_flush_interval(interval));
            })
        };
        if found.is_none() {
            self.report_missing(
                channel,
                format_args!("Couldn't change flush interval on {channel} logs. Loggers missing"),
            );
        }
    }

    /// Closes every closeable sink once, then stops the forwarder.
    ///
    /// Each failure is written to the error channel before the next sink is
    /// closed.
    pub fn close_all(&self) {
        let sinks: Vec<Arc<dyn LogSink>> = self.read().sinks.clone();
        for sink in sinks {
            let Some(closer) = sink.closer() else {
                continue;
            };
            if let Err(close_error) = closer.close() {
                self.error_local(format_args!("Failed to close {} log: {close_error}", sink.name()));
            }
        }
        if let Some(forwarder) = &self.forwarder {
            forwarder.close();
            let dropped = forwarder.dropped();
            if dropped > 0 {
                self.info_local(format_args!("{dropped} log records were not forwarded"));
            }
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn report_missing(&self, channel: &str, text: fmt::Arguments<'_>) {
        let error_channel_present = self.read().channels.contains_key(ERROR_CHANNEL);
        if channel == ERROR_CHANNEL || !error_channel_present {
            error!(target: LOG_TARGET, channel, "{text}");
            return;
        }
        self.log_to(true, ERROR_CHANNEL, text);
    }
}

impl Default for LogRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LogRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogRouter")
            .field("channels", &self.channels())
            .field("forwarding", &self.forwarder.is_some())
            .finish()
    }
}
