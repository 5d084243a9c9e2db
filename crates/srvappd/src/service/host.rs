//! Service host integration: status reports out, commands in.
//!
//! Status goes to systemd over the `sd_notify` datagram socket named by
//! `NOTIFY_SOCKET`. Commands arrive as POSIX signals and are translated into
//! [`HostCommand`] events for the controller.

use std::ffi::OsStr;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::net::{SocketAddr, UnixDatagram};
use std::path::Path;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::{env, fmt};

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM, SIGUSR1, SIGUSR2};
use signal_hook::iterator::{Handle, Signals};
use thiserror::Error;
use tracing::debug;

use super::SERVICE_TARGET;
use super::state::{ControlEvent, HostCommand, ServiceState, ServiceStatus};

/// Environment variable naming the notification socket.
pub const NOTIFY_SOCKET_ENV: &str = "NOTIFY_SOCKET";

/// Signals consumed while running under the service host.
pub const HOST_SIGNALS: [i32; 6] = [SIGTERM, SIGINT, SIGUSR1, SIGHUP, SIGQUIT, SIGUSR2];

/// Errors raised while talking to the service host.
#[derive(Debug, Error)]
pub enum HostError {
    /// The notification socket address was unusable.
    #[error("failed to open notification socket '{address}': {source}")]
    Connect {
        /// Value of `NOTIFY_SOCKET`.
        address: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Sending a notification failed.
    #[error("failed to notify service host: {source}")]
    Notify {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Installing the command signal handlers failed.
    #[error("failed to install host command handlers: {source}")]
    Signals {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Receives every status the controller reports.
pub trait ServiceHost: Send {
    /// Publishes `status` to the host.
    fn report(&self, status: &ServiceStatus) -> Result<(), HostError>;
}

/// Unbound datagram socket aimed at the host's notification address.
pub struct NotifySocket {
    socket: UnixDatagram,
    address: SocketAddr,
}

impl NotifySocket {
    /// Connects to the socket named by `NOTIFY_SOCKET`, if set.
    pub fn from_env() -> Result<Option<Self>, HostError> {
        match env::var_os(NOTIFY_SOCKET_ENV) {
            Some(address) if !address.is_empty() => Self::connect(&address).map(Some),
            _ => Ok(None),
        }
    }

    /// Connects to a filesystem path or, with a leading `@`, an abstract name.
    pub fn connect(address: &OsStr) -> Result<Self, HostError> {
        let connect_error = |source| HostError::Connect {
            address: address.to_string_lossy().into_owned(),
            source,
        };
        let target = notify_address(address).map_err(connect_error)?;
        let socket = UnixDatagram::unbound().map_err(connect_error)?;
        Ok(Self {
            socket,
            address: target,
        })
    }

    /// Sends one newline-separated assignment block.
    pub fn notify(&self, state: &str) -> Result<(), HostError> {
        self.socket
            .send_to_addr(state.as_bytes(), &self.address)
            .map(|_| ())
            .map_err(|source| HostError::Notify { source })
    }
}

impl fmt::Debug for NotifySocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifySocket")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

fn notify_address(address: &OsStr) -> io::Result<SocketAddr> {
    let bytes = address.as_bytes();
    if let Some(name) = bytes.strip_prefix(b"@") {
        return abstract_address(name);
    }
    SocketAddr::from_pathname(Path::new(address))
}

#[cfg(target_os = "linux")]
fn abstract_address(name: &[u8]) -> io::Result<SocketAddr> {
    use std::os::linux::net::SocketAddrExt;
    SocketAddr::from_abstract_name(name)
}

#[cfg(not(target_os = "linux"))]
fn abstract_address(_name: &[u8]) -> io::Result<SocketAddr> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "abstract socket names require Linux",
    ))
}

/// Notification payload for `state`.
#[must_use]
pub fn notify_message(state: ServiceState) -> &'static str {
    match state {
        ServiceState::StartPending => "STATUS=Starting",
        ServiceState::Running => "READY=1\nSTATUS=Running",
        ServiceState::StopPending => "STOPPING=1\nSTATUS=Stopping",
        ServiceState::Stopped => "STATUS=Stopped",
    }
}

/// Host backed by systemd's notification protocol.
///
/// Without `NOTIFY_SOCKET` every report is skipped, which keeps the service
/// run mode usable from a terminal.
#[derive(Debug)]
pub struct SystemdHost {
    socket: Option<NotifySocket>,
}

impl SystemdHost {
    /// Builds a host from the process environment.
    pub fn from_env() -> Result<Self, HostError> {
        NotifySocket::from_env().map(|socket| Self { socket })
    }

    /// Builds a host around an explicit socket.
    #[must_use]
    pub fn with_socket(socket: Option<NotifySocket>) -> Self {
        Self { socket }
    }
}

impl ServiceHost for SystemdHost {
    fn report(&self, status: &ServiceStatus) -> Result<(), HostError> {
        let message = notify_message(status.state);
        match &self.socket {
            Some(socket) => socket.notify(message),
            None => {
                debug!(
                    target: SERVICE_TARGET,
                    state = %status.state,
                    "not running under systemd; skipping notification"
                );
                Ok(())
            }
        }
    }
}

/// Maps a delivered signal to the command it stands for.
#[must_use]
pub fn command_for_signal(signal: i32) -> HostCommand {
    match signal {
        SIGTERM => HostCommand::Stop,
        SIGINT => HostCommand::Shutdown,
        SIGUSR1 => HostCommand::Interrogate,
        SIGHUP => HostCommand::Unrecognized("SIGHUP".to_owned()),
        SIGQUIT => HostCommand::Unrecognized("SIGQUIT".to_owned()),
        SIGUSR2 => HostCommand::Unrecognized("SIGUSR2".to_owned()),
        other => HostCommand::Unrecognized(format!("signal {other}")),
    }
}

/// Thread translating [`HOST_SIGNALS`] into controller events.
#[derive(Debug)]
pub struct SignalCommandSource {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl SignalCommandSource {
    /// Installs the handlers and starts forwarding to `events`.
    pub fn install(events: Sender<ControlEvent>) -> Result<Self, HostError> {
        let mut signals =
            Signals::new(HOST_SIGNALS).map_err(|source| HostError::Signals { source })?;
        let handle = signals.handle();
        let thread = thread::Builder::new()
            .name("host-commands".to_owned())
            .spawn(move || {
                for signal in signals.forever() {
                    let command = command_for_signal(signal);
                    debug!(target: SERVICE_TARGET, signal, ?command, "host command received");
                    if events.send(ControlEvent::Host(command)).is_err() {
                        break;
                    }
                }
            })
            .map_err(|source| HostError::Signals { source })?;
        Ok(Self {
            handle,
            thread: Some(thread),
        })
    }

    /// Unregisters the handlers and joins the thread.
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

impl Drop for SignalCommandSource {
    fn drop(&mut self) {
        self.stop();
    }
}
