use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Output format of the process-wide diagnostic subscriber.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per event, for log shippers.
    #[default]
    Json,
    /// Single-line human-readable events.
    Compact,
}

impl LogFormat {
    /// Returns `true` when events are rendered as JSON objects.
    #[must_use]
    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Error returned when a [`LogFormat`] cannot be parsed.
pub type LogFormatParseError = strum::ParseError;
