use serde::{Deserialize, Serialize};

/// Log configuration for the engine
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Log {
    /// Minimum level written to the error log
    pub loglevel: LogLevel,

    /// Access log file path. Omitted to log to stdout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<String>,

    /// Error log file path. Omitted to log to stdout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Log {
    /// Create a log section with the given level
    pub fn new(loglevel: LogLevel) -> Self {
        Self {
            loglevel,
            ..Default::default()
        }
    }
}

/// Engine log level. One of: `debug` `info` `warning` `error` `none`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    #[default]
    Warning,
    Error,
    None,
}
