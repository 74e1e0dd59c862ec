//! Process-wide logging setup.
//!
//! `dev` writes colored, human-readable lines to the console. `prod` writes
//! newline-delimited JSON records to daily-rotated files under the
//! configured directory, keeping 30 generations.
//!
//! Call [`init`] once at startup and hold the returned guard for the life
//! of the process; dropping it flushes the background writer.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;

use crate::config::{ConfigError, LogConfig, Stage};

/// Keeps the non-blocking log writer alive.
pub struct LogGuard {
    _worker: Option<WorkerGuard>,
}

/// Installs the global tracing subscriber described by `config`.
pub fn init(config: &LogConfig) -> Result<LogGuard, ConfigError> {
    let level: LevelFilter = config.level.into();
    match config.stage {
        Stage::Dev => {
            tracing_subscriber::fmt()
                .with_max_level(level)
                .with_ansi(true)
                .try_init()
                .map_err(|e| ConfigError::LoggingInit { message: e.to_string() })?;
            Ok(LogGuard { _worker: None })
        }
        Stage::Prod => {
            let appender = build_prod_appender(config)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .json()
                .with_max_level(level)
                .with_writer(writer)
                .with_ansi(false)
                .try_init()
                .map_err(|e| ConfigError::LoggingInit { message: e.to_string() })?;
            Ok(LogGuard { _worker: Some(guard) })
        }
    }
}

fn build_prod_appender(config: &LogConfig) -> Result<RollingFileAppender, ConfigError> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("router")
        .filename_suffix("log")
        .max_log_files(30)
        .build(&config.log_dir)
        .map_err(|e| ConfigError::LoggingInit { message: e.to_string() })
}
