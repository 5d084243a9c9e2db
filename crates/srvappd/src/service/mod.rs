//! Lifecycle control under a service host.

mod controller;
mod host;
mod registrar;
mod state;
mod workload;

pub use controller::ServiceController;
pub use host::{
    HOST_SIGNALS, HostError, NOTIFY_SOCKET_ENV, NotifySocket, ServiceHost, SignalCommandSource,
    SystemdHost, command_for_signal, notify_message,
};
pub use registrar::{
    AppIdentity, RegistrarError, RegistrarSession, ServiceRegistrar, SystemdRegistrar,
    install_service, service_unit, uninstall_service,
};
pub use state::{
    AcceptedCommands, ControlEvent, HostCommand, ServiceState, ServiceStateMachine, ServiceStatus,
    Transition, TransitionError,
};
pub use workload::{HEARTBEAT_COUNTER, HeartbeatWorkload, Workload, WorkloadError};

pub(crate) const SERVICE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::service");
