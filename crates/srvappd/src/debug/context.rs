//! State shared by every debug handler.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use futures::FutureExt;

use crate::counters::CounterRegistry;
use crate::log::{LogBuffer, LogRouter};
use crate::process::ShutdownCoordinator;

use super::inventory::HandlerInventory;

/// Delay between a trigger request and its action.
pub const TRIGGER_DELAY: Duration = Duration::from_secs(2);

/// Simulates a fatal fault on request.
pub trait CrashHandler: Send + Sync {
    /// Performs the crash. The production handler does not return.
    fn crash(&self);
}

/// Flushes the logs and aborts the process.
pub struct AbortCrashHandler {
    log: Arc<LogRouter>,
}

impl AbortCrashHandler {
    /// Handler logging through `log` before aborting.
    #[must_use]
    pub fn new(log: Arc<LogRouter>) -> Self {
        Self { log }
    }
}

impl CrashHandler for AbortCrashHandler {
    fn crash(&self) {
        self.log.error("Simulated crash requested; aborting");
        self.log.close_all();
        std::process::abort();
    }
}

/// The delayed actions the debug surface can schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Calls the crash handler.
    Crash,
    /// Signals process shutdown.
    Shutdown,
}

impl Trigger {
    /// Word used in responses and log entries.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Crash => "Crash",
            Self::Shutdown => "Shutdown",
        }
    }
}

/// Collaborators and settings for the debug routers.
pub struct DebugContext {
    log: Arc<LogRouter>,
    buffer: Arc<LogBuffer>,
    counters: Arc<CounterRegistry>,
    shutdown: Arc<ShutdownCoordinator>,
    crash: Arc<dyn CrashHandler>,
    private_static_dir: Option<PathBuf>,
    public_static_dir: Option<PathBuf>,
    trigger_delay: Duration,
    inventory: RwLock<HandlerInventory>,
    crash_pending: AtomicBool,
    shutdown_pending: AtomicBool,
}

impl DebugContext {
    /// Context without static roots, using [`TRIGGER_DELAY`].
    pub fn new(
        log: Arc<LogRouter>,
        buffer: Arc<LogBuffer>,
        counters: Arc<CounterRegistry>,
        shutdown: Arc<ShutdownCoordinator>,
        crash: Arc<dyn CrashHandler>,
    ) -> Self {
        Self {
            log,
            buffer,
            counters,
            shutdown,
            crash,
            private_static_dir: None,
            public_static_dir: None,
            trigger_delay: TRIGGER_DELAY,
            inventory: RwLock::new(HandlerInventory::default()),
            crash_pending: AtomicBool::new(false),
            shutdown_pending: AtomicBool::new(false),
        }
    }

    /// Sets the static roots of the private and public listeners.
    #[must_use]
    pub fn with_static_dirs(mut self, private: Option<PathBuf>, public: Option<PathBuf>) -> Self {
        self.private_static_dir = private;
        self.public_static_dir = public;
        self
    }

    /// Overrides the trigger delay.
    #[must_use]
    pub fn with_trigger_delay(mut self, delay: Duration) -> Self {
        self.trigger_delay = delay;
        self
    }

    pub(crate) fn log(&self) -> &Arc<LogRouter> {
        &self.log
    }

    pub(crate) fn buffer(&self) -> &LogBuffer {
        &self.buffer
    }

    pub(crate) fn counters(&self) -> &CounterRegistry {
        &self.counters
    }

    pub(crate) fn private_static_dir(&self) -> Option<&Path> {
        self.private_static_dir.as_deref()
    }

    pub(crate) fn public_static_dir(&self) -> Option<&Path> {
        self.public_static_dir.as_deref()
    }

    /// Current listener inventory.
    #[must_use]
    pub fn inventory(&self) -> HandlerInventory {
        self.inventory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the inventory once listeners are bound.
    pub fn set_inventory(&self, inventory: HandlerInventory) {
        *self.inventory.write().unwrap_or_else(PoisonError::into_inner) = inventory;
    }

    /// Schedules `trigger` unless one is already pending.
    ///
    /// Returns `false` when the request was merged into a pending one. Must
    /// be called from within a tokio runtime.
    pub(crate) fn schedule(self: &Arc<Self>, trigger: Trigger) -> bool {
        let pending = match trigger {
            Trigger::Crash => &self.crash_pending,
            Trigger::Shutdown => &self.shutdown_pending,
        };
        if pending.swap(true, Ordering::AcqRel) {
            return false;
        }
        let context = Arc::clone(self);
        let delay = self.trigger_delay;
        spawn_guarded(Arc::clone(&self.log), trigger.label(), async move {
            tokio::time::sleep(delay).await;
            match trigger {
                Trigger::Crash => context.crash.crash(),
                Trigger::Shutdown => {
                    context.shutdown.signal_shutdown();
                }
            }
        });
        true
    }
}

/// Spawns a detached task whose panic is logged instead of propagated.
pub(crate) fn spawn_guarded<F>(log: Arc<LogRouter>, name: &'static str, task: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(panic) = AssertUnwindSafe(task).catch_unwind().await {
            log.error(format_args!(
                "{name} task panicked: {}",
                panic_message(panic.as_ref())
            ));
        }
    });
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
