//! Server bootstrap orchestration.

use std::io;
use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

use srvapp_config::{Config, ServicePaths, ServicePathsError};

use crate::counters::CounterRegistry;
use crate::debug::{AbortCrashHandler, CrashHandler};
use crate::health::HealthReporter;
use crate::log::{
    ConsoleSink, FileSink, ForwardError, LogBuffer, LogRouter, LogSink, STANDARD_CHANNELS,
    SinkError, UdpForwarder,
};
use crate::process::ShutdownCoordinator;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the server configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader returning a fixed configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps `config`.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// Runtime paths could not be prepared.
    #[error("failed to prepare runtime paths: {source}")]
    Paths {
        /// Underlying path error.
        #[source]
        source: ServicePathsError,
    },
    /// The durable log file could not be opened.
    #[error("failed to open log file: {source}")]
    LogFile {
        /// Underlying sink error.
        #[source]
        source: SinkError,
    },
    /// The telemetry forwarder could not be set up.
    #[error("failed to set up log forwarding: {source}")]
    Forwarder {
        /// Underlying forwarder error.
        #[source]
        source: ForwardError,
    },
    /// The forwarding worker could not be spawned.
    #[error("failed to start log forwarding worker: {source}")]
    ForwarderWorker {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Collaborators shared by every component after bootstrap.
pub struct AppContext {
    config: Config,
    paths: ServicePaths,
    log: Arc<LogRouter>,
    buffer: Arc<LogBuffer>,
    counters: Arc<CounterRegistry>,
    shutdown: Arc<ShutdownCoordinator>,
    crash: Arc<dyn CrashHandler>,
    reporter: Arc<dyn HealthReporter>,
    telemetry: TelemetryHandle,
}

impl AppContext {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Derived filesystem locations.
    #[must_use]
    pub fn paths(&self) -> &ServicePaths {
        &self.paths
    }

    /// Channel router with the built-in sinks registered.
    #[must_use]
    pub fn log(&self) -> &Arc<LogRouter> {
        &self.log
    }

    /// In-memory tail shared with the debug surface.
    #[must_use]
    pub fn buffer(&self) -> &Arc<LogBuffer> {
        &self.buffer
    }

    /// Counter registry.
    #[must_use]
    pub fn counters(&self) -> &Arc<CounterRegistry> {
        &self.counters
    }

    /// Process shutdown coordinator.
    #[must_use]
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Crash handler used by the debug surface.
    #[must_use]
    pub fn crash_handler(&self) -> &Arc<dyn CrashHandler> {
        &self.crash
    }

    /// Lifecycle observer.
    #[must_use]
    pub fn reporter(&self) -> &Arc<dyn HealthReporter> {
        &self.reporter
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Replaces the crash handler.
    #[must_use]
    pub fn with_crash_handler(mut self, crash: Arc<dyn CrashHandler>) -> Self {
        self.crash = crash;
        self
    }
}

/// Bootstraps the server using the supplied collaborators.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
) -> Result<AppContext, BootstrapError> {
    reporter.bootstrap_starting();
    match assemble(loader, Arc::clone(&reporter)) {
        Ok(context) => {
            reporter.bootstrap_succeeded(&context.config);
            Ok(context)
        }
        Err(error) => {
            reporter.bootstrap_failed(&error);
            Err(error)
        }
    }
}

fn assemble(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
) -> Result<AppContext, BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    let telemetry =
        telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;
    let paths =
        ServicePaths::from_config(&config).map_err(|source| BootstrapError::Paths { source })?;

    let log = Arc::new(build_router(&config)?);
    let buffer = Arc::new(LogBuffer::new(config.log_buffer_capacity()));
    let file = FileSink::open(paths.log_file(), config.log_flush_interval())
        .map_err(|source| BootstrapError::LogFile { source })?;
    let sinks: [Arc<dyn LogSink>; 3] = [
        Arc::clone(&buffer) as Arc<dyn LogSink>,
        Arc::new(file),
        Arc::new(ConsoleSink::new()),
    ];
    register_standard_sinks(&log, &sinks);

    let crash: Arc<dyn CrashHandler> = Arc::new(AbortCrashHandler::new(Arc::clone(&log)));
    Ok(AppContext {
        config,
        paths,
        log,
        buffer,
        counters: Arc::new(CounterRegistry::new()),
        shutdown: Arc::new(ShutdownCoordinator::new()),
        crash,
        reporter,
        telemetry,
    })
}

fn build_router(config: &Config) -> Result<LogRouter, BootstrapError> {
    let Some(endpoint) = config.monitor_endpoint() else {
        return Ok(LogRouter::new());
    };
    let forwarder =
        UdpForwarder::connect(endpoint).map_err(|source| BootstrapError::Forwarder { source })?;
    LogRouter::with_forwarder(Arc::new(forwarder))
        .map_err(|source| BootstrapError::ForwarderWorker { source })
}

/// Registers each sink under every standard channel, in order.
pub fn register_standard_sinks(log: &LogRouter, sinks: &[Arc<dyn LogSink>]) {
    for channel in STANDARD_CHANNELS {
        for sink in sinks {
            log.register(channel, Arc::clone(sink));
        }
    }
}
