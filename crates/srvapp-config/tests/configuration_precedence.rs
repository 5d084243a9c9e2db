use std::cell::RefCell;
use std::ffi::OsString;
use std::fs;
use std::sync::{Mutex, MutexGuard};

use once_cell::sync::Lazy;
use ortho_config::OrthoConfig;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

use srvapp_config::{Config, RunMode, default_http_listen, default_log_filter, default_log_format};

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

const RUN_MODE_ENV: &str = "SRVAPP_RUN_MODE";

struct Harness {
    temp_dir: TempDir,
    cli_args: RefCell<Vec<OsString>>,
    env_overrides: RefCell<Vec<(String, Option<OsString>)>>,
    loaded: RefCell<Option<Config>>,
    error: RefCell<Option<String>>,
    _env_lock: MutexGuard<'static, ()>,
}

impl Harness {
    fn new() -> Self {
        let env_lock = ENV_MUTEX
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        let temp_dir = match TempDir::new() {
            Ok(dir) => dir,
            Err(error) => panic!("failed to create temporary directory: {error}"),
        };
        Self {
            temp_dir,
            cli_args: RefCell::new(vec![OsString::from("srvappd")]),
            env_overrides: RefCell::new(Vec::new()),
            loaded: RefCell::new(None),
            error: RefCell::new(None),
            _env_lock: env_lock,
        }
    }

    fn write_config(&self, run_mode: RunMode) {
        let path = self.temp_dir.path().join("srvapp.toml");
        let toml = format!("run_mode = \"{run_mode}\"\nlog_buffer_capacity = 7\n");

        if let Err(error) = fs::write(&path, toml) {
            panic!("failed to write configuration: {error}");
        }

        let mut args = self.cli_args.borrow_mut();
        args.push(OsString::from("--config-path"));
        args.push(path.into_os_string());
    }

    fn set_env(&self, key: &str, value: &str) {
        let previous = std::env::var_os(key);
        // Environment mutation is `unsafe` on edition 2024; the harness holds
        // the process-wide env lock and restores overrides in `Drop`.
        unsafe { std::env::set_var(key, value) };
        self.env_overrides
            .borrow_mut()
            .push((key.to_owned(), previous));
    }

    fn push_cli_arg(&self, arg: impl Into<OsString>) {
        self.cli_args.borrow_mut().push(arg.into());
    }

    fn load(&self) {
        if self.loaded.borrow().is_some() || self.error.borrow().is_some() {
            return;
        }

        let args = self.cli_args.borrow().clone();
        match Config::load_from_iter(args) {
            Ok(config) => {
                *self.loaded.borrow_mut() = Some(config);
            }
            Err(error) => {
                *self.error.borrow_mut() = Some(error.to_string());
            }
        }
    }

    fn loaded_config(&self) -> Config {
        self.load();

        if let Some(error) = self.error.borrow().as_ref() {
            panic!("configuration failed to load: {error}");
        }

        match self.loaded.borrow().as_ref() {
            Some(config) => config.clone(),
            None => panic!("configuration was not loaded"),
        }
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        let mut overrides = self.env_overrides.borrow_mut();
        while let Some((key, value)) = overrides.pop() {
            if let Some(os_value) = value {
                unsafe { std::env::set_var(&key, os_value) };
            } else {
                unsafe { std::env::remove_var(&key) };
            }
        }
    }
}

#[fixture]
fn harness() -> Harness {
    Harness::new()
}

fn parse_mode(text: &str) -> RunMode {
    match text.parse::<RunMode>() {
        Ok(mode) => mode,
        Err(error) => panic!("invalid run mode '{text}': {error}"),
    }
}

#[given("a configuration file setting the run mode to \"{mode}\"")]
fn given_configuration_file(harness: &Harness, mode: String) {
    harness.write_config(parse_mode(&mode));
}

#[given("the environment overrides the run mode to \"{mode}\"")]
fn given_environment_override(harness: &Harness, mode: String) {
    harness.set_env(RUN_MODE_ENV, &mode);
}

#[when("the CLI sets the run mode to \"{mode}\"")]
fn when_cli_override(harness: &Harness, mode: String) {
    harness.push_cli_arg("--run-mode");
    harness.push_cli_arg(OsString::from(&mode));
}

#[when("the configuration loads without overrides")]
fn when_load_without_overrides(harness: &Harness) {
    harness.load();
}

#[then("loading the configuration resolves the run mode to \"{mode}\"")]
fn then_resolved_mode(harness: &Harness, mode: String) {
    let config = harness.loaded_config();
    assert_eq!(config.run_mode(), parse_mode(&mode));
    assert_eq!(
        config.log_buffer_capacity(),
        7,
        "file values should survive higher-precedence overrides of other keys"
    );
}

#[then("loading the configuration applies the built-in defaults")]
fn then_defaults_applied(harness: &Harness) {
    let config = harness.loaded_config();

    assert_eq!(config.run_mode(), RunMode::Interactive);
    assert_eq!(config.log_filter(), default_log_filter());
    assert_eq!(config.log_format(), default_log_format());
    assert_eq!(config.http_listen(), default_http_listen());
    assert!(config.private_static_dir().is_none());
    assert!(config.monitor_endpoint().is_none());
}

#[scenario(path = "tests/features/configuration_precedence.feature")]
fn configuration_precedence(#[from(harness)] harness: Harness) {
    let _ = harness;
}
