//! Structured health reporting for server lifecycle events.

use std::sync::Arc;

use crate::bootstrap::BootstrapError;
use crate::service::{ServiceStatus, WorkloadError};

use srvapp_config::Config;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before bootstrap begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked before the workload is started.
    fn workload_starting(&self);

    /// Invoked after the workload starts successfully.
    fn workload_ready(&self);

    /// Invoked when the workload fails to start.
    fn workload_failed(&self, error: &WorkloadError);

    /// Invoked after the workload has been stopped.
    fn workload_stopped(&self);

    /// Invoked for every status accepted for the service host.
    fn service_status(&self, status: &ServiceStatus);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn workload_starting(&self) {
        (**self).workload_starting();
    }

    fn workload_ready(&self) {
        (**self).workload_ready();
    }

    fn workload_failed(&self, error: &WorkloadError) {
        (**self).workload_failed(error);
    }

    fn workload_stopped(&self) {
        (**self).workload_stopped();
    }

    fn service_status(&self, status: &ServiceStatus) {
        (**self).service_status(status);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting server bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            run_mode = %config.run_mode(),
            http_listen = %config.http_listen(),
            log_filter = %config.log_filter(),
            log_format = ?config.log_format(),
            "server bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "server bootstrap failed"
        );
    }

    fn workload_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "workload_starting",
            "starting workload"
        );
    }

    fn workload_ready(&self) {
        tracing::info!(target: HEALTH_TARGET, event = "workload_ready", "workload ready");
    }

    fn workload_failed(&self, error: &WorkloadError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "workload_failed",
            error = %error,
            "workload failed to start"
        );
    }

    fn workload_stopped(&self) {
        tracing::info!(target: HEALTH_TARGET, event = "workload_stopped", "workload stopped");
    }

    fn service_status(&self, status: &ServiceStatus) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "service_status",
            state = %status.state,
            accepts_stop = status.accepts.stop,
            accepts_shutdown = status.accepts.shutdown,
            "service status reported"
        );
    }
}
