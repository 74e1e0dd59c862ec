use std::path::PathBuf;

use serde::Serialize;

/// Deployment stage, which selects the log sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Colored, human-readable console lines.
    Dev,
    /// Newline-delimited JSON written to daily-rotated files.
    Prod,
}

/// Minimum level of records to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::level_filters::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Self::ERROR,
            LogLevel::Warn => Self::WARN,
            LogLevel::Info => Self::INFO,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Trace => Self::TRACE,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize)]
pub struct LogConfig {
    pub stage: Stage,
    pub level: LogLevel,
    /// Directory the `prod` sink writes rotated files into.
    pub log_dir: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { stage: Stage::Dev, level: LogLevel::Debug, log_dir: PathBuf::from("logs") }
    }
}
