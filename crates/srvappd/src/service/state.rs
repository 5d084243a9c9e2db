//! Service states, host commands and the forward-only transition guard.

use std::fmt;

use thiserror::Error;

/// State reported to the service host.
///
/// Declaration order is lifecycle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ServiceState {
    /// Startup in progress.
    StartPending,
    /// Workload running and accepting commands.
    Running,
    /// Shutdown in progress.
    StopPending,
    /// Terminal.
    Stopped,
}

impl ServiceState {
    /// Every state in lifecycle order.
    pub const ALL: [Self; 4] = [
        Self::StartPending,
        Self::Running,
        Self::StopPending,
        Self::Stopped,
    ];

    /// Stable lowercase label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StartPending => "start_pending",
            Self::Running => "running",
            Self::StopPending => "stop_pending",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host commands accepted in a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AcceptedCommands {
    /// Stop requests are honoured.
    pub stop: bool,
    /// System shutdown notifications are honoured.
    pub shutdown: bool,
}

impl AcceptedCommands {
    /// Accepts nothing.
    pub const NONE: Self = Self {
        stop: false,
        shutdown: false,
    };

    /// Accepts stop and shutdown.
    pub const STOP_AND_SHUTDOWN: Self = Self {
        stop: true,
        shutdown: true,
    };
}

/// Status record sent to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceStatus {
    /// Current state.
    pub state: ServiceState,
    /// Commands accepted while in `state`.
    pub accepts: AcceptedCommands,
}

impl ServiceStatus {
    /// Status for `state` with the commands that state accepts.
    #[must_use]
    pub fn new(state: ServiceState) -> Self {
        let accepts = match state {
            ServiceState::Running => AcceptedCommands::STOP_AND_SHUTDOWN,
            _ => AcceptedCommands::NONE,
        };
        Self { state, accepts }
    }
}

/// Command delivered by the service host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
    /// Asks for the current status.
    Interrogate,
    /// Asks the service to stop.
    Stop,
    /// The host system is shutting down.
    Shutdown,
    /// Anything else; carries a label for diagnostics.
    Unrecognized(String),
}

/// Input to the controller's event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlEvent {
    /// A command from the host.
    Host(HostCommand),
    /// The shutdown coordinator fired.
    ShutdownSignaled,
}

/// Outcome of an accepted transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The state changed.
    Advanced {
        /// Previous state, `None` before the first report.
        from: Option<ServiceState>,
        /// New state.
        to: ServiceState,
    },
    /// The requested state equals the current one.
    Unchanged(ServiceState),
}

/// A backward or skipping transition was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal service transition from {} to {to}", from.map_or("init", ServiceState::as_str))]
pub struct TransitionError {
    /// Current state, `None` before the first report.
    pub from: Option<ServiceState>,
    /// Rejected target.
    pub to: ServiceState,
}

/// Forward-only state holder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceStateMachine {
    current: Option<ServiceState>,
}

impl ServiceStateMachine {
    /// Creates a machine that has not reported anything yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state, `None` before the first report.
    #[must_use]
    pub fn current(&self) -> Option<ServiceState> {
        self.current
    }

    /// Reports whether `from -> to` is a legal step.
    #[must_use]
    pub fn allows(from: Option<ServiceState>, to: ServiceState) -> bool {
        use ServiceState::{Running, StartPending, StopPending, Stopped};
        match (from, to) {
            (None, StartPending) => true,
            (Some(current), next) if current == next => true,
            (Some(StartPending), Running | StopPending) => true,
            (Some(Running), StopPending) => true,
            (Some(StopPending), Stopped) => true,
            _ => false,
        }
    }

    /// Moves to `next` when the step is legal.
    pub fn advance(&mut self, next: ServiceState) -> Result<Transition, TransitionError> {
        let from = self.current;
        if !Self::allows(from, next) {
            return Err(TransitionError { from, to: next });
        }
        if from == Some(next) {
            return Ok(Transition::Unchanged(next));
        }
        self.current = Some(next);
        Ok(Transition::Advanced { from, to: next })
    }

    /// Returns `true` once `Stopped` has been reached.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.current == Some(ServiceState::Stopped)
    }
}
