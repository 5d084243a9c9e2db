//! Test double for [`HealthReporter`] that records structured events for assertions.

use std::sync::Mutex;

use crate::bootstrap::BootstrapError;
use crate::health::HealthReporter;
use crate::service::{ServiceState, ServiceStatus, WorkloadError};

use srvapp_config::Config;

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    WorkloadStarting,
    WorkloadReady,
    WorkloadFailed(String),
    WorkloadStopped,
    Status(ServiceState),
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn workload_starting(&self) {
        self.record(HealthEvent::WorkloadStarting);
    }

    fn workload_ready(&self) {
        self.record(HealthEvent::WorkloadReady);
    }

    fn workload_failed(&self, error: &WorkloadError) {
        self.record(HealthEvent::WorkloadFailed(error.to_string()));
    }

    fn workload_stopped(&self) {
        self.record(HealthEvent::WorkloadStopped);
    }

    fn service_status(&self, status: &ServiceStatus) {
        self.record(HealthEvent::Status(status.state));
    }
}
