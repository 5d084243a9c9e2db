//! Supervises launch sequencing for every run mode.

use std::sync::Arc;

use tracing::info;

use srvapp_config::RunMode;

use crate::bootstrap::{AppContext, ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::debug::{DebugContext, DebugServer};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::service::{
    AppIdentity, HeartbeatWorkload, ServiceController, ServiceHost, SignalCommandSource,
    SystemdHost, SystemdRegistrar, Workload, install_service, uninstall_service,
};

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::SignalRelay;

/// Builds the singleton workload once bootstrap has produced the context.
pub(crate) type WorkloadFactory = dyn Fn(&AppContext) -> Arc<dyn Workload>;

/// Runs the server using the production collaborators.
pub fn run_process() -> Result<(), LaunchError> {
    let reporter: Arc<dyn HealthReporter> = Arc::new(StructuredHealthReporter::new());
    run_with(&SystemConfigLoader, reporter, &heartbeat_workload)
}

fn heartbeat_workload(app: &AppContext) -> Arc<dyn Workload> {
    Arc::new(HeartbeatWorkload::new(
        app.config().heartbeat_interval(),
        Arc::clone(app.counters()),
        Arc::clone(app.log()),
    ))
}

/// Runs the server with injected collaborators.
///
/// The log router is closed last, whatever the outcome.
pub(crate) fn run_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    workload: &WorkloadFactory,
) -> Result<(), LaunchError> {
    let app = bootstrap_with(loader, reporter)?;
    let mode = app.config().run_mode();
    info!(target: PROCESS_TARGET, %mode, "starting server runtime");

    let result = if mode.is_administrative() {
        run_registration(&app, mode);
        Ok(())
    } else {
        run_server(&app, mode, workload(&app))
    };

    app.log().close_all();
    info!(target: PROCESS_TARGET, "shutdown sequence completed");
    result
}

fn run_server(
    app: &AppContext,
    mode: RunMode,
    workload: Arc<dyn Workload>,
) -> Result<(), LaunchError> {
    let server = start_debug_server(app)?;
    let outcome = match mode {
        RunMode::ServiceRun => run_service(app, workload),
        _ => run_interactive(app, workload.as_ref()),
    };
    server.shutdown();
    outcome
}

fn start_debug_server(app: &AppContext) -> Result<DebugServer, LaunchError> {
    let config = app.config();
    let context = DebugContext::new(
        Arc::clone(app.log()),
        Arc::clone(app.buffer()),
        Arc::clone(app.counters()),
        Arc::clone(app.shutdown()),
        Arc::clone(app.crash_handler()),
    )
    .with_static_dirs(
        config.private_static_dir().map(|dir| dir.as_std_path().to_path_buf()),
        config.public_static_dir().map(|dir| dir.as_std_path().to_path_buf()),
    );
    let server = DebugServer::start(
        Arc::new(context),
        config.http_listen(),
        config.http_public_listen(),
    )?;
    app.log().info(format_args!(
        "Debug listener bound to {}",
        server.private_addr()
    ));
    Ok(server)
}

fn run_interactive(app: &AppContext, workload: &dyn Workload) -> Result<(), LaunchError> {
    let relay = SignalRelay::install(Arc::clone(app.shutdown()))?;
    let reporter = app.reporter();
    let log = app.log();

    reporter.workload_starting();
    let started = match workload.start() {
        Ok(()) => {
            reporter.workload_ready();
            true
        }
        Err(error) => {
            reporter.workload_failed(&error);
            log.error(format_args!("Failed to start workload: {error}"));
            app.shutdown().signal_shutdown();
            false
        }
    };

    app.shutdown().block_until_shutdown();
    log.info("Shutdown signaled");
    if started {
        workload.stop();
        reporter.workload_stopped();
    }
    relay.close();
    Ok(())
}

fn run_service(app: &AppContext, workload: Arc<dyn Workload>) -> Result<(), LaunchError> {
    let log = app.log();
    let host: Box<dyn ServiceHost> = match SystemdHost::from_env() {
        Ok(host) => Box::new(host),
        Err(error) => {
            log.error(format_args!("Service execution error: {error}"));
            app.shutdown().signal_shutdown();
            return Ok(());
        }
    };
    let controller = ServiceController::new(
        Arc::clone(log),
        Arc::clone(app.shutdown()),
        host,
        Arc::clone(app.reporter()),
    );
    let commands = match controller.events().map(SignalCommandSource::install) {
        Some(Ok(source)) => source,
        Some(Err(error)) => {
            log.error(format_args!("Service execution error: {error}"));
            app.shutdown().signal_shutdown();
            return Ok(());
        }
        None => {
            app.shutdown().signal_shutdown();
            return Ok(());
        }
    };

    let handle = controller
        .spawn(workload)
        .map_err(|source| LaunchError::Controller { source })?;
    app.shutdown().block_until_shutdown();
    if handle.join().is_err() {
        log.error("Service controller panicked");
    }
    commands.close();
    Ok(())
}

fn run_registration(app: &AppContext, mode: RunMode) {
    let log = app.log();
    let registrar = match app.paths().unit_dir() {
        Ok(dir) => SystemdRegistrar::new(dir),
        Err(error) => {
            log.error(format_args!("Error connecting to service manager: {error}"));
            app.shutdown().signal_shutdown();
            return;
        }
    };
    let name = app.config().service_name();
    match mode {
        RunMode::ServiceInstall => match AppIdentity::current(name) {
            Ok(identity) => {
                install_service(log, &registrar, &identity);
            }
            Err(error) => log.error(format_args!("Error installing service: {error}")),
        },
        RunMode::ServiceUninstall => {
            uninstall_service(log, &registrar, name);
        }
        RunMode::Interactive | RunMode::ServiceRun => {}
    }
    app.shutdown().signal_shutdown();
}
