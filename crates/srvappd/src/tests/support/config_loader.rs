//! Test configuration loaders for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;

use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig, OrthoError};
use tempfile::TempDir;

use srvapp_config::{Config, RunMode};

use crate::bootstrap::ConfigLoader;

/// Service name used by every test configuration.
pub const TEST_SERVICE_NAME: &str = "srvapp-test";

/// Loader rooting every writable path under a temporary directory.
pub struct TestConfigLoader {
    dir: TempDir,
    run_mode: RunMode,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temporary directory"),
            run_mode: RunMode::Interactive,
        }
    }

    #[must_use]
    pub fn with_run_mode(mut self, run_mode: RunMode) -> Self {
        self.run_mode = run_mode;
        self
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    fn utf8(&self, name: &str) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.dir.path().join(name))
            .expect("temporary path was not valid UTF-8")
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            log_dir: self.utf8("logs"),
            log_flush_interval_secs: 0,
            run_mode: self.run_mode,
            service_name: Some(TEST_SERVICE_NAME.to_owned()),
            service_unit_dir: Some(self.utf8("units")),
            http_listen: "127.0.0.1:0".parse().expect("valid address"),
            ..Config::default()
        })
    }
}

/// Loader that intentionally fails by passing an unknown run mode.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("srvappd"),
            OsString::from("--run-mode"),
            OsString::from("hibernate"),
        ];
        Config::load_from_iter(args)
    }
}
