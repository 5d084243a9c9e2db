//! HTTP introspection surface.
//!
//! The private listener exposes the log buffer, counters, a listener
//! inventory, delayed crash/shutdown triggers and private static files. The
//! optional public listener serves public static files only.

mod context;
mod inventory;
mod routes;
mod server;
mod static_files;

pub use context::{AbortCrashHandler, CrashHandler, DebugContext, TRIGGER_DELAY, Trigger};
#[cfg(test)]
pub(crate) use context::spawn_guarded;
pub use inventory::{HandlerInventory, ListenerInfo, PRIVATE_ROUTES, PUBLIC_ROUTES, RouteInfo};
pub use routes::{private_router, public_router};
pub use server::{DebugServer, DebugServerError};

pub(crate) const DEBUG_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::debug");
