//! Signal mapping and readiness notification.

use std::ffi::OsStr;
use std::os::unix::net::UnixDatagram;
use std::time::Duration;

use rstest::rstest;
use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM, SIGUSR1, SIGUSR2};
use tempfile::TempDir;

use crate::service::{
    HostCommand, NotifySocket, ServiceHost, ServiceState, ServiceStatus, SystemdHost,
    command_for_signal, notify_message,
};

#[rstest]
#[case(SIGTERM, HostCommand::Stop)]
#[case(SIGINT, HostCommand::Shutdown)]
#[case(SIGUSR1, HostCommand::Interrogate)]
#[case(SIGHUP, HostCommand::Unrecognized("SIGHUP".to_owned()))]
#[case(SIGQUIT, HostCommand::Unrecognized("SIGQUIT".to_owned()))]
#[case(SIGUSR2, HostCommand::Unrecognized("SIGUSR2".to_owned()))]
fn signals_map_to_host_commands(#[case] signal: i32, #[case] expected: HostCommand) {
    assert_eq!(command_for_signal(signal), expected);
}

#[rstest]
fn readiness_is_announced_only_when_running() {
    for state in ServiceState::ALL {
        let message = notify_message(state);
        assert_eq!(
            message.contains("READY=1"),
            state == ServiceState::Running,
            "{state}: {message}"
        );
    }
    assert!(notify_message(ServiceState::StopPending).starts_with("STOPPING=1"));
}

#[rstest]
fn notifications_reach_a_bound_socket() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("notify.sock");
    let listener = UnixDatagram::bind(&path).expect("bind notify socket");
    listener
        .set_read_timeout(Some(Duration::from_secs(2)))
        .expect("read timeout");

    let socket = NotifySocket::connect(path.as_os_str()).expect("connect");
    let host = SystemdHost::with_socket(Some(socket));
    host.report(&ServiceStatus::new(ServiceState::Running))
        .expect("report should send");

    let mut buffer = [0_u8; 128];
    let received = listener.recv(&mut buffer).expect("datagram");
    assert_eq!(&buffer[..received], b"READY=1\nSTATUS=Running");
}

#[rstest]
fn host_without_socket_accepts_reports() {
    let host = SystemdHost::with_socket(None);
    assert!(host.report(&ServiceStatus::new(ServiceState::Stopped)).is_ok());
}

#[rstest]
fn sending_to_a_missing_socket_fails() {
    let dir = TempDir::new().expect("tempdir");
    let socket =
        NotifySocket::connect(OsStr::new(&dir.path().join("absent.sock"))).expect("unbound socket");
    assert!(socket.notify("STATUS=Starting").is_err());
}
