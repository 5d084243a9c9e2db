use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Command-line spelling that re-enters the binary under host supervision.
///
/// Installed service entries launch the executable with these arguments.
pub const SERVICE_RUN_ARGS: [&str; 2] = ["--run-mode", "service_run"];

/// Mutually exclusive startup path, chosen once per process invocation.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum RunMode {
    /// Foreground process driven by a console and terminal signals.
    #[default]
    Interactive,
    /// Long-running service supervised by the OS service host.
    ServiceRun,
    /// Register this binary with the service host, then exit.
    ServiceInstall,
    /// Remove a previously registered service entry, then exit.
    ServiceUninstall,
}

impl RunMode {
    /// Returns `true` for the one-shot administrative modes.
    #[must_use]
    pub const fn is_administrative(self) -> bool {
        matches!(self, Self::ServiceInstall | Self::ServiceUninstall)
    }
}

/// Error returned when a [`RunMode`] cannot be parsed.
pub type RunModeParseError = strum::ParseError;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("interactive", RunMode::Interactive)]
    #[case("service_run", RunMode::ServiceRun)]
    #[case("SERVICE_INSTALL", RunMode::ServiceInstall)]
    #[case("service_uninstall", RunMode::ServiceUninstall)]
    fn parses_run_modes(#[case] text: &str, #[case] expected: RunMode) {
        assert_eq!(text.parse::<RunMode>().expect("mode should parse"), expected);
    }

    #[rstest]
    fn service_run_args_round_trip_through_parser() {
        let [flag, value] = SERVICE_RUN_ARGS;
        assert_eq!(flag, "--run-mode");
        assert_eq!(
            value.parse::<RunMode>().expect("mode should parse"),
            RunMode::ServiceRun
        );
    }

    #[rstest]
    #[case(RunMode::Interactive, false)]
    #[case(RunMode::ServiceRun, false)]
    #[case(RunMode::ServiceInstall, true)]
    #[case(RunMode::ServiceUninstall, true)]
    fn flags_administrative_modes(#[case] mode: RunMode, #[case] administrative: bool) {
        assert_eq!(mode.is_administrative(), administrative);
    }
}
