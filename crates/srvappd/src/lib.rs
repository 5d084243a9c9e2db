//! Runtime skeleton for the srvapp server.
//!
//! The crate decides how the process starts, how it reports its internal
//! state, and how it shuts down. Two subsystems carry the weight:
//!
//! - [`log`] fans each log call out to the sinks registered under a named
//!   channel (in-memory tail, durable file, console) and optionally forwards
//!   it to a remote monitor without blocking the caller.
//! - [`service`] drives the singleton workload through a forward-only state
//!   machine (`StartPending`, `Running`, `StopPending`, `Stopped`) while
//!   reporting to systemd, and the process layer unifies interactive and
//!   host-supervised runs behind one [`ShutdownCoordinator`].
//!
//! The [`debug`] module exposes read-only HTTP introspection plus delayed
//! crash and shutdown triggers. Collaborators are assembled once by
//! [`bootstrap_with`] into an [`AppContext`] and passed down explicitly; the
//! only process-wide state is the `tracing` subscriber.

mod bootstrap;
pub mod counters;
pub mod debug;
mod health;
pub mod log;
mod process;
pub mod service;
mod telemetry;

pub use bootstrap::{
    AppContext, BootstrapError, ConfigLoader, StaticConfigLoader, SystemConfigLoader,
    bootstrap_with, register_standard_sinks,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{
    INTERACTIVE_SIGNALS, LaunchError, ShutdownCoordinator, ShutdownError, SignalRelay, run_process,
};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
