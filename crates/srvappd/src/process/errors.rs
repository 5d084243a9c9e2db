//! Defines the unified error surface for process launch.

use std::io;

use thiserror::Error;

use crate::bootstrap::BootstrapError;
use crate::debug::DebugServerError;

use super::shutdown::ShutdownError;

/// Errors surfaced while launching or supervising the server process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Bootstrapping the server failed.
    #[error("server bootstrap failed: {source}")]
    Bootstrap {
        /// Underlying bootstrap error.
        #[source]
        source: BootstrapError,
    },
    /// Installing the interactive signal relay failed.
    #[error("failed to await shutdown signal: {source}")]
    Shutdown {
        /// Underlying shutdown error.
        #[source]
        source: ShutdownError,
    },
    /// The debug listeners could not be started.
    #[error("debug server failed: {source}")]
    DebugServer {
        /// Underlying server error.
        #[source]
        source: DebugServerError,
    },
    /// The service controller thread could not be spawned.
    #[error("failed to start service controller: {source}")]
    Controller {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

impl From<BootstrapError> for LaunchError {
    fn from(source: BootstrapError) -> Self {
        Self::Bootstrap { source }
    }
}

impl From<ShutdownError> for LaunchError {
    fn from(source: ShutdownError) -> Self {
        Self::Shutdown { source }
    }
}

impl From<DebugServerError> for LaunchError {
    fn from(source: DebugServerError) -> Self {
        Self::DebugServer { source }
    }
}
