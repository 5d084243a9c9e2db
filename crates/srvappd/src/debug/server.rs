//! Owns the HTTP runtime and its listeners.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::runtime::{self, Runtime};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::DEBUG_TARGET;
use super::context::DebugContext;
use super::inventory::{HandlerInventory, ListenerInfo};
use super::routes::{private_router, public_router};

const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors raised while starting the debug server.
#[derive(Debug, Error)]
pub enum DebugServerError {
    /// The async runtime could not be built.
    #[error("failed to build HTTP runtime: {source}")]
    Runtime {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A listener could not be bound.
    #[error("failed to bind HTTP listener {address}: {source}")]
    Bind {
        /// Requested address.
        address: SocketAddr,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Running debug listeners.
///
/// Dropping the server without calling [`DebugServer::shutdown`] tears the
/// runtime down abruptly.
pub struct DebugServer {
    runtime: Runtime,
    stop: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
    private_addr: SocketAddr,
    public_addr: Option<SocketAddr>,
}

impl DebugServer {
    /// Binds the private listener and, when given, the public one.
    pub fn start(
        context: Arc<DebugContext>,
        private: SocketAddr,
        public: Option<SocketAddr>,
    ) -> Result<Self, DebugServerError> {
        let runtime = runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("debug-http")
            .enable_all()
            .build()
            .map_err(|source| DebugServerError::Runtime { source })?;

        let private_listener = bind(&runtime, private)?;
        let private_addr = local_addr(&private_listener, private)?;
        let public_listener = public.map(|address| bind(&runtime, address)).transpose()?;
        let public_addr = match (&public_listener, public) {
            (Some(listener), Some(requested)) => Some(local_addr(listener, requested)?),
            _ => None,
        };

        let mut listeners = vec![ListenerInfo::private(private_addr)];
        listeners.extend(public_addr.map(ListenerInfo::public));
        context.set_inventory(HandlerInventory::new(listeners));

        let (stop, stopped) = watch::channel(false);
        let mut tasks = vec![serve(
            &runtime,
            "private",
            private_listener,
            private_router(Arc::clone(&context)),
            stopped.clone(),
        )];
        if let Some(listener) = public_listener {
            tasks.push(serve(
                &runtime,
                "public",
                listener,
                public_router(Arc::clone(&context)),
                stopped,
            ));
        }

        info!(
            target: DEBUG_TARGET,
            private = %private_addr,
            public = ?public_addr,
            "debug listeners started"
        );
        Ok(Self {
            runtime,
            stop,
            tasks,
            private_addr,
            public_addr,
        })
    }

    /// Bound address of the private listener.
    #[must_use]
    pub fn private_addr(&self) -> SocketAddr {
        self.private_addr
    }

    /// Bound address of the public listener.
    #[must_use]
    pub fn public_addr(&self) -> Option<SocketAddr> {
        self.public_addr
    }

    /// Stops accepting connections, drains in-flight requests and stops the
    /// runtime. Pending delayed triggers are dropped.
    pub fn shutdown(self) {
        let Self {
            runtime,
            stop,
            tasks,
            ..
        } = self;
        let _ = stop.send(true);
        runtime.block_on(async {
            for task in tasks {
                if let Err(error) = task.await {
                    warn!(target: DEBUG_TARGET, %error, "debug listener task failed");
                }
            }
        });
        runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);
        info!(target: DEBUG_TARGET, "debug listeners stopped");
    }
}

fn bind(runtime: &Runtime, address: SocketAddr) -> Result<TcpListener, DebugServerError> {
    runtime
        .block_on(TcpListener::bind(address))
        .map_err(|source| DebugServerError::Bind { address, source })
}

fn local_addr(listener: &TcpListener, requested: SocketAddr) -> Result<SocketAddr, DebugServerError> {
    listener
        .local_addr()
        .map_err(|source| DebugServerError::Bind {
            address: requested,
            source,
        })
}

fn serve(
    runtime: &Runtime,
    name: &'static str,
    listener: TcpListener,
    router: axum::Router,
    mut stopped: watch::Receiver<bool>,
) -> JoinHandle<()> {
    runtime.spawn(async move {
        let signal = async move {
            let _ = stopped.wait_for(|stop| *stop).await;
        };
        if let Err(error) = axum::serve(listener, router)
            .with_graceful_shutdown(signal)
            .await
        {
            warn!(target: DEBUG_TARGET, listener = name, %error, "debug listener failed");
        }
    })
}
