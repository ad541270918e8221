use std::path::PathBuf;

use thiserror::Error;

/// Everything that can be wrong with a job description.
///
/// These are fatal and raised before any session is created. Messages never
/// include secret values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config document: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("environment variable `{0}` referenced in config is not set")]
    UnsetEnv(String),

    #[error("malformed environment reference in `{field}` (expected ${{NAME}})")]
    MalformedReference { field: String },

    #[error("execution.script_path {} {reason}", path.display())]
    Script { path: PathBuf, reason: &'static str },

    #[error("`{field}` is required")]
    Missing { field: &'static str },

    #[error("`{field}` = {value} is out of range {bounds}")]
    OutOfRange {
        field: &'static str,
        value: String,
        bounds: &'static str,
    },

    #[error("`{field}` = `{value}` is not a valid {expected}")]
    InvalidValue {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("`{field}` = `{value}` is not a calendar date (expected YYYY-MM-DD)")]
    InvalidDate { field: &'static str, value: String },

    #[error("dates.end ({end}) is before dates.start ({start})")]
    DateRange { start: String, end: String },

    #[error("authentication: {0}")]
    Auth(String),

    #[error("replay section: {0}")]
    Replay(String),

    #[error("unsupported session backend url `{0}` (expected local:// or sim://)")]
    UnsupportedBackend(String),
}
