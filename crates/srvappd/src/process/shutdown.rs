//! Process-wide single-shot shutdown signal.

use std::io;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};
use thiserror::Error;
use tracing::info;

use super::PROCESS_TARGET;

/// Signals that end an interactive run.
pub const INTERACTIVE_SIGNALS: [i32; 4] = [SIGINT, SIGTERM, SIGQUIT, SIGHUP];

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Monotonic shutdown flag with a blocking join point.
///
/// The flag moves from unset to set exactly once. Every waiter, present or
/// future, observes the set flag.
#[derive(Debug, Default)]
pub struct ShutdownCoordinator {
    signaled: Mutex<bool>,
    wake: Condvar,
}

impl ShutdownCoordinator {
    /// Creates an unsignalled coordinator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests shutdown. Returns `true` only for the call that set the flag.
    pub fn signal_shutdown(&self) -> bool {
        let mut signaled = self.lock();
        if *signaled {
            return false;
        }
        *signaled = true;
        self.wake.notify_all();
        true
    }

    /// Reports whether shutdown has been requested.
    #[must_use]
    pub fn is_signaled(&self) -> bool {
        *self.lock()
    }

    /// Parks the calling thread until shutdown is requested.
    pub fn block_until_shutdown(&self) {
        let mut signaled = self.lock();
        while !*signaled {
            signaled = self
                .wake
                .wait(signaled)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Waits at most `timeout`. Returns `true` when shutdown was requested.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut signaled = self.lock();
        while !*signaled {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            signaled = self
                .wake
                .wait_timeout(signaled, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.signaled.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Background thread relaying termination signals to a coordinator.
#[derive(Debug)]
pub struct SignalRelay {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl SignalRelay {
    /// Installs handlers for [`INTERACTIVE_SIGNALS`].
    pub fn install(shutdown: Arc<ShutdownCoordinator>) -> Result<Self, ShutdownError> {
        let mut signals =
            Signals::new(INTERACTIVE_SIGNALS).map_err(|source| ShutdownError::Install { source })?;
        let handle = signals.handle();
        let thread = thread::Builder::new()
            .name("shutdown-signals".to_owned())
            .spawn(move || {
                for signal in signals.forever() {
                    info!(target: PROCESS_TARGET, signal, "shutdown signal received");
                    shutdown.signal_shutdown();
                }
            })
            .map_err(|source| ShutdownError::Install { source })?;
        Ok(Self {
            handle,
            thread: Some(thread),
        })
    }

    /// Unregisters the handlers and joins the relay thread.
    pub fn close(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for SignalRelay {
    fn drop(&mut self) {
        self.stop();
    }
}
