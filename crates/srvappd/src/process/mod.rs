//! Process lifecycle: launch sequencing and shutdown coordination.

mod errors;
pub(crate) mod launch;
pub(crate) mod shutdown;

pub use errors::LaunchError;
pub use launch::run_process;
#[cfg(test)]
pub(crate) use launch::run_with;
pub use shutdown::{INTERACTIVE_SIGNALS, ShutdownCoordinator, ShutdownError, SignalRelay};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
