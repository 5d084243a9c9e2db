//! Registration of the binary with the service host.

use std::env;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use srvapp_config::SERVICE_RUN_ARGS;

use crate::log::LogRouter;

/// Errors raised by the service registrar.
#[derive(Debug, Error)]
pub enum RegistrarError {
    /// The executable path could not be determined.
    #[error("failed to resolve executable path: {source}")]
    Executable {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The unit directory could not be prepared.
    #[error("failed to prepare unit directory '{path}': {source}")]
    Connect {
        /// Unit directory.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Probing for an existing unit failed.
    #[error("failed to inspect unit '{path}': {source}")]
    Inspect {
        /// Unit file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing the unit failed.
    #[error("failed to write unit '{path}': {source}")]
    Create {
        /// Unit file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Removing the unit failed.
    #[error("failed to remove unit '{path}': {source}")]
    Delete {
        /// Unit file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Name and absolute executable path registered with the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppIdentity {
    name: String,
    exe_path: PathBuf,
}

impl AppIdentity {
    /// Builds an identity from explicit parts.
    pub fn new(name: impl Into<String>, exe_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            exe_path: exe_path.into(),
        }
    }

    /// Identity of the running executable.
    pub fn current(name: impl Into<String>) -> Result<Self, RegistrarError> {
        let exe_path = env::current_exe().map_err(|source| RegistrarError::Executable { source })?;
        Ok(Self::new(name, exe_path))
    }

    /// Service name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Executable re-entered by the host.
    #[must_use]
    pub fn exe_path(&self) -> &Path {
        &self.exe_path
    }
}

/// Entry point to the host's service registry.
pub trait ServiceRegistrar {
    /// Opens a session against the registry.
    fn connect(&self) -> Result<Box<dyn RegistrarSession + '_>, RegistrarError>;
}

/// One connected registry session.
pub trait RegistrarSession {
    /// Reports whether `name` is registered.
    fn exists(&self, name: &str) -> Result<bool, RegistrarError>;

    /// Registers `identity` to start automatically in service mode.
    fn create(&self, identity: &AppIdentity) -> Result<(), RegistrarError>;

    /// Removes the registration for `name`.
    fn delete(&self, name: &str) -> Result<(), RegistrarError>;
}

/// Registrar writing systemd unit files.
#[derive(Debug, Clone)]
pub struct SystemdRegistrar {
    unit_dir: PathBuf,
}

impl SystemdRegistrar {
    /// Registrar for units under `unit_dir`.
    pub fn new(unit_dir: impl Into<PathBuf>) -> Self {
        Self {
            unit_dir: unit_dir.into(),
        }
    }
}

impl ServiceRegistrar for SystemdRegistrar {
    fn connect(&self) -> Result<Box<dyn RegistrarSession + '_>, RegistrarError> {
        fs::create_dir_all(&self.unit_dir).map_err(|source| RegistrarError::Connect {
            path: self.unit_dir.clone(),
            source,
        })?;
        Ok(Box::new(UnitDirectory {
            dir: &self.unit_dir,
        }))
    }
}

struct UnitDirectory<'a> {
    dir: &'a Path,
}

impl UnitDirectory<'_> {
    fn unit_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.service"))
    }
}

impl RegistrarSession for UnitDirectory<'_> {
    fn exists(&self, name: &str) -> Result<bool, RegistrarError> {
        let path = self.unit_path(name);
        path.try_exists()
            .map_err(|source| RegistrarError::Inspect { path, source })
    }

    fn create(&self, identity: &AppIdentity) -> Result<(), RegistrarError> {
        let path = self.unit_path(identity.name());
        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o644);
        }
        options
            .open(&path)
            .and_then(|mut file| file.write_all(service_unit(identity).as_bytes()))
            .map_err(|source| RegistrarError::Create { path, source })
    }

    fn delete(&self, name: &str) -> Result<(), RegistrarError> {
        let path = self.unit_path(name);
        fs::remove_file(&path).map_err(|source| RegistrarError::Delete { path, source })
    }
}

/// Unit text starting `identity` in service mode.
#[must_use]
pub fn service_unit(identity: &AppIdentity) -> String {
    let exe = identity.exe_path().display().to_string();
    let exe = if exe.contains(char::is_whitespace) {
        format!("\"{exe}\"")
    } else {
        exe
    };
    // Relative log directories resolve against the binary's directory.
    let working_dir = identity
        .exe_path()
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| format!("WorkingDirectory={}\n", dir.display()))
        .unwrap_or_default();
    format!(
        r"[Unit]
Description={name} service

[Service]
Type=notify
{working_dir}ExecStart={exe} {args}
Restart=on-failure

[Install]
WantedBy=default.target
",
        name = identity.name(),
        args = SERVICE_RUN_ARGS.join(" "),
    )
}

/// Registers the running binary. Returns `true` when a unit was written.
///
/// Every outcome is logged; nothing is propagated.
pub fn install_service(
    log: &LogRouter,
    registrar: &dyn ServiceRegistrar,
    identity: &AppIdentity,
) -> bool {
    let name = identity.name();
    log.info(format_args!("Installing service {name}"));
    let session = match registrar.connect() {
        Ok(session) => session,
        Err(error) => {
            log.error(format_args!("Error connecting to service manager: {error}"));
            return false;
        }
    };
    match session.exists(name) {
        Ok(false) => {}
        Ok(true) => {
            log.error("Service already exists");
            return false;
        }
        Err(error) => {
            log.error(format_args!("Error querying service: {error}"));
            return false;
        }
    }
    if let Err(error) = session.create(identity) {
        log.error(format_args!("Error creating service: {error}"));
        return false;
    }
    log.info(format_args!("Service {name} installed"));
    true
}

/// Removes the registration. Returns `true` when a unit was deleted.
pub fn uninstall_service(log: &LogRouter, registrar: &dyn ServiceRegistrar, name: &str) -> bool {
    log.info(format_args!("Removing service {name}"));
    let session = match registrar.connect() {
        Ok(session) => session,
        Err(error) => {
            log.error(format_args!("Error connecting to service manager: {error}"));
            return false;
        }
    };
    match session.exists(name) {
        Ok(true) => {}
        Ok(false) => {
            log.error(format_args!("Service {name} doesn't exist"));
            return false;
        }
        Err(error) => {
            log.error(format_args!("Error querying service: {error}"));
            return false;
        }
    }
    if let Err(error) = session.delete(name) {
        log.error(format_args!("Error deleting service: {error}"));
        return false;
    }
    log.info(format_args!("Service {name} deleted"));
    true
}
