//! Off-thread forwarding of log records to a remote monitor.
//!
//! Dispatch hands messages to a bounded queue and returns immediately; a
//! dedicated worker thread drains the queue. A full queue drops the message
//! and counts the drop. Errors and panics raised by the forwarder are caught
//! on the worker and never reach the dispatching thread.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tracing::{error, warn};

use super::LOG_TARGET;
use super::message::{LogMessage, LogRecord};

/// Remote collaborator receiving non-local log records.
pub trait LogForwarder: Send + Sync {
    /// Delivers one record. Called only from the forwarding worker.
    fn forward(&self, record: &LogRecord) -> Result<(), ForwardError>;
}

/// Errors raised while forwarding records.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// Binding the local socket failed.
    #[error("failed to bind forwarding socket: {source}")]
    Bind {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Encoding the record failed.
    #[error("failed to encode log record: {source}")]
    Encode {
        /// Underlying serialisation error.
        #[from]
        source: serde_json::Error,
    },
    /// Sending the datagram failed.
    #[error("failed to send log record to {endpoint}: {source}")]
    Send {
        /// Monitor address.
        endpoint: SocketAddr,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Sends each record as one JSON datagram.
#[derive(Debug)]
pub struct UdpForwarder {
    socket: UdpSocket,
    endpoint: SocketAddr,
}

impl UdpForwarder {
    /// Binds an ephemeral local socket of the endpoint's address family.
    pub fn connect(endpoint: SocketAddr) -> Result<Self, ForwardError> {
        let local: SocketAddr = match endpoint {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(local).map_err(|source| ForwardError::Bind { source })?;
        Ok(Self { socket, endpoint })
    }
}

impl LogForwarder for UdpForwarder {
    fn forward(&self, record: &LogRecord) -> Result<(), ForwardError> {
        let payload = serde_json::to_vec(record)?;
        self.socket
            .send_to(&payload, self.endpoint)
            .map(|_| ())
            .map_err(|source| ForwardError::Send {
                endpoint: self.endpoint,
                source,
            })
    }
}

/// Bounded hand-off between dispatching threads and the forwarding worker.
pub(crate) struct ForwardQueue {
    sender: RwLock<Option<SyncSender<LogMessage>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    dropped: Arc<AtomicU64>,
}

impl ForwardQueue {
    /// Starts the worker thread.
    pub(crate) fn spawn(
        forwarder: Arc<dyn LogForwarder>,
        capacity: usize,
    ) -> Result<Self, io::Error> {
        let (sender, receiver) = mpsc::sync_channel(capacity.max(1));
        let worker = thread::Builder::new()
            .name("log-forwarder".to_owned())
            .spawn(move || drain(&*forwarder, receiver))?;
        Ok(Self {
            sender: RwLock::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
            dropped: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Queues a message without blocking.
    pub(crate) fn submit(&self, message: &LogMessage) {
        let guard = self.sender.read().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = guard.as_ref() else {
            return;
        };
        match sender.try_send(message.clone()) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Messages discarded because the queue was full.
    pub(crate) fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Stops accepting messages and waits for the worker to drain the queue.
    pub(crate) fn close(&self) {
        self.sender
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = worker {
            if handle.join().is_err() {
                error!(target: LOG_TARGET, "log forwarder worker terminated abnormally");
            }
        }
    }
}

fn drain(forwarder: &dyn LogForwarder, receiver: Receiver<LogMessage>) {
    for message in receiver {
        let record = message.to_record();
        match panic::catch_unwind(AssertUnwindSafe(|| forwarder.forward(&record))) {
            Ok(Ok(())) => {}
            Ok(Err(forward_error)) => warn!(
                target: LOG_TARGET,
                channel = %record.channel,
                error = %forward_error,
                "failed to forward log record"
            ),
            Err(_) => error!(
                target: LOG_TARGET,
                channel = %record.channel,
                "log forwarder panicked; record dropped"
            ),
        }
    }
}
