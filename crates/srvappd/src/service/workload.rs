//! The singleton workload driven by the lifecycle controller.

use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;

use crate::counters::CounterRegistry;
use crate::log::LogRouter;
use crate::process::ShutdownCoordinator;

/// Counter bumped on every heartbeat.
pub const HEARTBEAT_COUNTER: &str = "heartbeat.ticks";

/// Errors raised while starting a workload.
#[derive(Debug, Error)]
pub enum WorkloadError {
    /// `start` was called while the workload was running.
    #[error("workload is already running")]
    AlreadyRunning,
    /// The worker thread could not be spawned.
    #[error("failed to spawn workload thread: {source}")]
    Spawn {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The workload refused to start.
    #[error("workload failed to start: {reason}")]
    Failed {
        /// Human-readable cause.
        reason: String,
    },
}

/// Application work started once and stopped once per process.
pub trait Workload: Send + Sync {
    /// Starts the work. Must return promptly.
    fn start(&self) -> Result<(), WorkloadError>;

    /// Stops the work and waits for it to wind down.
    fn stop(&self);
}

impl<T> Workload for Arc<T>
where
    T: Workload + ?Sized,
{
    fn start(&self) -> Result<(), WorkloadError> {
        (**self).start()
    }

    fn stop(&self) {
        (**self).stop();
    }
}

struct Worker {
    stop: Arc<ShutdownCoordinator>,
    thread: JoinHandle<()>,
}

/// Ticks a counter at a fixed interval until stopped.
pub struct HeartbeatWorkload {
    interval: Duration,
    counters: Arc<CounterRegistry>,
    log: Arc<LogRouter>,
    worker: Mutex<Option<Worker>>,
}

impl HeartbeatWorkload {
    /// Creates a stopped heartbeat.
    #[must_use]
    pub fn new(interval: Duration, counters: Arc<CounterRegistry>, log: Arc<LogRouter>) -> Self {
        Self {
            interval,
            counters,
            log,
            worker: Mutex::new(None),
        }
    }
}

impl Workload for HeartbeatWorkload {
    fn start(&self) -> Result<(), WorkloadError> {
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if worker.is_some() {
            return Err(WorkloadError::AlreadyRunning);
        }
        let stop = Arc::new(ShutdownCoordinator::new());
        let ticks = self.counters.counter(HEARTBEAT_COUNTER);
        let interval = self.interval;
        let thread = {
            let stop = Arc::clone(&stop);
            thread::Builder::new()
                .name("heartbeat".to_owned())
                .spawn(move || {
                    while !stop.wait_timeout(interval) {
                        ticks.add(1);
                    }
                })
                .map_err(|source| WorkloadError::Spawn { source })?
        };
        *worker = Some(Worker { stop, thread });
        self.log.info(format_args!(
            "Heartbeat started ({}s interval)",
            interval.as_secs_f64()
        ));
        Ok(())
    }

    fn stop(&self) {
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(Worker { stop, thread }) = worker else {
            return;
        };
        stop.signal_shutdown();
        if thread.join().is_err() {
            self.log.error("Heartbeat thread panicked");
        }
        self.log.info("Heartbeat stopped");
    }
}
