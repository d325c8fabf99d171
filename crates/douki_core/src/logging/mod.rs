//! Logging setup.
//!
//! Everything in the crate logs through `tracing`. Binaries call
//! [`init_tracing`] once, or [`init_tracing_with_file`] to also keep a log
//! file next to the configured logs directory. `RUST_LOG` always wins over
//! the configured level.

mod types;

pub use types::LogLevel;

use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// File name used inside the logs directory.
pub const LOG_FILE_NAME: &str = "douki.log";

/// Initialize the global subscriber, writing to stderr.
pub fn init_tracing(default_level: LogLevel) {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(build_filter(default_level))
        .init();
}

/// Initialize the global subscriber, writing to stderr and to
/// `<dir>/douki.log`.
///
/// The returned guard flushes the file writer on drop and must be held
/// until the program exits.
pub fn init_tracing_with_file(default_level: LogLevel, dir: &Path) -> io::Result<WorkerGuard> {
    std::fs::create_dir_all(dir)?;
    let appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .with(build_filter(default_level))
        .init();

    Ok(guard)
}

/// Initialize tracing for tests (only logs warnings and above).
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}

fn build_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_strings_match_levels() {
        assert_eq!(LogLevel::Debug.as_filter_str(), "debug");
        assert_eq!(LogLevel::Info.to_string(), "info");
    }

    #[test]
    fn test_tracing_can_be_initialized_twice() {
        init_test_tracing();
        init_test_tracing();
        tracing::warn!("logged from test");
    }
}
