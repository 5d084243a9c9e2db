//! Shared doubles for the srvappd test suites.

mod config_loader;
mod reporter;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub use config_loader::{FailingConfigLoader, TEST_SERVICE_NAME, TestConfigLoader};
pub use reporter::{HealthEvent, RecordingHealthReporter};

use crate::AppContext;
use crate::debug::CrashHandler;
use crate::log::{
    Closeable, FlushInterval, LogMessage, LogRouter, LogSink, SinkError, Toggle,
};
use crate::service::{HostError, ServiceHost, ServiceState, ServiceStatus, Workload, WorkloadError};

/// Capabilities a [`RecordingSink`] advertises.
#[derive(Debug, Clone, Copy, Default)]
pub struct Capabilities {
    pub close: bool,
    pub toggle: bool,
    pub flush: bool,
    pub fail_close: bool,
}

/// Sink recording every delivery and capability call.
#[derive(Debug)]
pub struct RecordingSink {
    name: String,
    capabilities: Capabilities,
    messages: Mutex<Vec<(String, String)>>,
    enabled: AtomicBool,
    closes: AtomicUsize,
    intervals: Mutex<Vec<Duration>>,
}

impl RecordingSink {
    pub fn new(name: &str) -> Arc<Self> {
        Self::with_capabilities(name, Capabilities::default())
    }

    pub fn with_capabilities(name: &str, capabilities: Capabilities) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_owned(),
            capabilities,
            messages: Mutex::new(Vec::new()),
            enabled: AtomicBool::new(true),
            closes: AtomicUsize::new(0),
            intervals: Mutex::new(Vec::new()),
        })
    }

    /// Recorded `(channel, text)` pairs in delivery order.
    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().expect("sink mutex poisoned").clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.messages().into_iter().map(|(_, text)| text).collect()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn intervals(&self) -> Vec<Duration> {
        self.intervals.lock().expect("sink mutex poisoned").clone()
    }
}

impl LogSink for RecordingSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn print(&self, message: &LogMessage) {
        if !self.enabled.load(Ordering::SeqCst) {
            return;
        }
        self.messages
            .lock()
            .expect("sink mutex poisoned")
            .push((message.channel().to_owned(), message.text().to_owned()));
    }

    fn closer(&self) -> Option<&dyn Closeable> {
        self.capabilities.close.then_some(self as &dyn Closeable)
    }

    fn toggle(&self) -> Option<&dyn Toggle> {
        self.capabilities.toggle.then_some(self as &dyn Toggle)
    }

    fn flush_control(&self) -> Option<&dyn FlushInterval> {
        self.capabilities.flush.then_some(self as &dyn FlushInterval)
    }
}

impl Closeable for RecordingSink {
    fn close(&self) -> Result<(), SinkError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.capabilities.fail_close {
            return Err(SinkError::Flush {
                sink: self.name.clone(),
                source: std::io::Error::other("disk full"),
            });
        }
        Ok(())
    }
}

impl Toggle for RecordingSink {
    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}

impl FlushInterval for RecordingSink {
    fn set_flush_interval(&self, interval: Duration) {
        self.intervals
            .lock()
            .expect("sink mutex poisoned")
            .push(interval);
    }
}

/// Router with one recording sink on each of `channels`, shared across them.
pub fn router_with(channels: &[&str]) -> (Arc<LogRouter>, Arc<RecordingSink>) {
    let router = Arc::new(LogRouter::new());
    let sink = RecordingSink::new("recording");
    for channel in channels {
        router.register(channel, sink.clone());
    }
    (router, sink)
}

/// Host remembering every reported state.
#[derive(Debug, Default, Clone)]
pub struct RecordingHost {
    reports: Arc<Mutex<Vec<ServiceState>>>,
}

impl RecordingHost {
    pub fn reports(&self) -> Vec<ServiceState> {
        self.reports.lock().expect("host mutex poisoned").clone()
    }
}

impl ServiceHost for RecordingHost {
    fn report(&self, status: &ServiceStatus) -> Result<(), HostError> {
        self.reports
            .lock()
            .expect("host mutex poisoned")
            .push(status.state);
        Ok(())
    }
}

/// Workload whose start outcome is scripted.
#[derive(Debug, Default)]
pub struct ScriptedWorkload {
    fail_start: AtomicBool,
    stops: AtomicUsize,
}

impl ScriptedWorkload {
    pub fn set_failing(&self, failing: bool) {
        self.fail_start.store(failing, Ordering::SeqCst);
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl Workload for ScriptedWorkload {
    fn start(&self) -> Result<(), WorkloadError> {
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(WorkloadError::Failed {
                reason: "scripted failure".to_owned(),
            });
        }
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Workload factory for runs that never start a workload.
pub fn idle_workload(_app: &AppContext) -> Arc<dyn Workload> {
    Arc::new(ScriptedWorkload::default())
}

/// Crash handler counting invocations instead of aborting.
#[derive(Debug, Default)]
pub struct RecordingCrashHandler {
    crashes: AtomicUsize,
}

impl RecordingCrashHandler {
    pub fn crashes(&self) -> usize {
        self.crashes.load(Ordering::SeqCst)
    }
}

impl CrashHandler for RecordingCrashHandler {
    fn crash(&self) {
        self.crashes.fetch_add(1, Ordering::SeqCst);
    }
}
