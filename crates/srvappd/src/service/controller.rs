//! Actor driving the service-host handshake.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use tracing::warn;

use crate::health::HealthReporter;
use crate::log::LogRouter;
use crate::process::ShutdownCoordinator;

use super::SERVICE_TARGET;
use super::host::ServiceHost;
use super::state::{
    ControlEvent, HostCommand, ServiceState, ServiceStateMachine, ServiceStatus, Transition,
};
use super::workload::Workload;

/// Owns the service state machine and reacts to host and shutdown events.
///
/// The controller runs on one thread and consumes a single event stream, so
/// the state machine is never shared. `Stopped` is always the last report.
pub struct ServiceController {
    log: Arc<LogRouter>,
    shutdown: Arc<ShutdownCoordinator>,
    host: Box<dyn ServiceHost>,
    reporter: Arc<dyn HealthReporter>,
    machine: ServiceStateMachine,
    events: Receiver<ControlEvent>,
    sender: Option<Sender<ControlEvent>>,
}

impl ServiceController {
    /// Creates a controller in its pre-start state.
    pub fn new(
        log: Arc<LogRouter>,
        shutdown: Arc<ShutdownCoordinator>,
        host: Box<dyn ServiceHost>,
        reporter: Arc<dyn HealthReporter>,
    ) -> Self {
        let (sender, events) = mpsc::channel();
        Self {
            log,
            shutdown,
            host,
            reporter,
            machine: ServiceStateMachine::new(),
            events,
            sender: Some(sender),
        }
    }

    /// Handle for feeding host commands to the controller.
    #[must_use]
    pub fn events(&self) -> Option<Sender<ControlEvent>> {
        self.sender.clone()
    }

    /// Runs the controller on a dedicated thread.
    pub fn spawn(
        self,
        workload: Arc<dyn Workload>,
    ) -> std::io::Result<JoinHandle<Option<ServiceState>>> {
        thread::Builder::new()
            .name("service-controller".to_owned())
            .spawn(move || self.run(workload.as_ref()))
    }

    /// Drives the workload through one full lifecycle and returns the final
    /// state.
    pub fn run(mut self, workload: &dyn Workload) -> Option<ServiceState> {
        let relay = self.start_shutdown_relay();

        self.log.info("Initializing service");
        self.report(ServiceState::StartPending);

        self.reporter.workload_starting();
        let started = match workload.start() {
            Ok(()) => {
                self.reporter.workload_ready();
                self.log.info("Service initialized");
                self.report(ServiceState::Running);
                true
            }
            Err(error) => {
                self.reporter.workload_failed(&error);
                self.log.error(format_args!("Failed to start workload: {error}"));
                self.report(ServiceState::StopPending);
                self.shutdown.signal_shutdown();
                false
            }
        };

        self.event_loop();

        if started {
            workload.stop();
            self.reporter.workload_stopped();
        }
        self.report(ServiceState::Stopped);

        if let Some(relay) = relay {
            let _ = relay.join();
        }
        self.machine.current()
    }

    fn event_loop(&mut self) {
        loop {
            let Ok(event) = self.events.recv() else {
                self.shutdown.signal_shutdown();
                self.report(ServiceState::StopPending);
                break;
            };
            match event {
                ControlEvent::ShutdownSignaled => {
                    self.log.debug("Service shutdown signal received");
                    self.report(ServiceState::StopPending);
                    break;
                }
                ControlEvent::Host(HostCommand::Interrogate) => self.interrogate(),
                ControlEvent::Host(HostCommand::Stop | HostCommand::Shutdown) => {
                    self.log.info("Service stop requested");
                    self.report(ServiceState::StopPending);
                    self.shutdown.signal_shutdown();
                }
                ControlEvent::Host(HostCommand::Unrecognized(command)) => {
                    self.log
                        .error(format_args!("Unhandled command received from host: {command}"));
                }
            }
        }
    }

    fn interrogate(&self) {
        let Some(state) = self.machine.current() else {
            return;
        };
        let status = ServiceStatus::new(state);
        self.log.debug(format_args!("Service interrogate: {state}"));
        self.publish(&status);
    }

    fn report(&mut self, state: ServiceState) {
        match self.machine.advance(state) {
            Ok(Transition::Advanced { .. }) => self.publish(&ServiceStatus::new(state)),
            Ok(Transition::Unchanged(_)) => {}
            Err(error) => self.log.error(error),
        }
    }

    fn publish(&self, status: &ServiceStatus) {
        self.reporter.service_status(status);
        if let Err(error) = self.host.report(status) {
            warn!(target: SERVICE_TARGET, %error, state = %status.state, "status report failed");
            self.log
                .error_local(format_args!("Failed to report service status: {error}"));
        }
    }

    // Converts the coordinator's one-shot signal into an event. The
    // controller keeps no sender of its own, so the stream ends only once
    // every external sender and the relay are gone.
    fn start_shutdown_relay(&mut self) -> Option<JoinHandle<()>> {
        let sender = self.sender.take()?;
        let shutdown = Arc::clone(&self.shutdown);
        let spawned = thread::Builder::new()
            .name("shutdown-relay".to_owned())
            .spawn(move || {
                shutdown.block_until_shutdown();
                let _ = sender.send(ControlEvent::ShutdownSignaled);
            });
        match spawned {
            Ok(handle) => Some(handle),
            Err(error) => {
                self.log
                    .error(format_args!("Failed to start shutdown relay: {error}"));
                self.shutdown.signal_shutdown();
                None
            }
        }
    }
}
