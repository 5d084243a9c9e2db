//! Bounded in-memory sink backing the log tail endpoint.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use super::message::{LogMessage, LogRecord};
use super::sink::{LogSink, Toggle};

/// Ring buffer retaining the most recent messages across all channels.
#[derive(Debug)]
pub struct LogBuffer {
    capacity: usize,
    entries: Mutex<VecDeque<LogMessage>>,
    enabled: AtomicBool,
}

impl LogBuffer {
    /// Creates a buffer holding at most `capacity` messages.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            enabled: AtomicBool::new(true),
        }
    }

    /// Maximum number of retained messages.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the retained messages, oldest first.
    #[must_use]
    pub fn read_all(&self) -> Vec<LogRecord> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(LogMessage::to_record)
            .collect()
    }

    /// Number of retained messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` when nothing has been retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LogSink for LogBuffer {
    fn name(&self) -> &str {
        "buffer"
    }

    fn print(&self, message: &LogMessage) {
        if !self.enabled.load(Ordering::Acquire) {
            return;
        }
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(message.clone());
    }

    fn toggle(&self) -> Option<&dyn Toggle> {
        Some(self)
    }
}

impl Toggle for LogBuffer {
    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}
