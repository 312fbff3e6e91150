//! Tracing setup for the engine binary.
//!
//! Console output by default; when a log directory is configured the
//! subscriber writes to a daily-rolling file instead, optionally as
//! JSON lines.

use std::path::Path;

use tracing_subscriber::EnvFilter;

/// Initialize console-only logging at the default level.
pub fn init_logger() {
    init_logger_with_file(None, None, None);
}

/// Initialize the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `log_level` (default "info")
/// becomes the filter directive. `log_dir` must already exist, a
/// missing directory silently falls back to console output.
pub fn init_logger_with_file(log_level: Option<&str>, json: Option<bool>, log_dir: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.unwrap_or("info")));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false);

    let file_appender = log_dir
        .map(Path::new)
        .filter(|dir| dir.exists())
        .map(|dir| tracing_appender::rolling::daily(dir, "desk-server"));

    match (file_appender, json.unwrap_or(false)) {
        (Some(appender), true) => builder.json().with_writer(appender).init(),
        (Some(appender), false) => builder.with_writer(appender).init(),
        (None, true) => builder.json().init(),
        (None, false) => builder.init(),
    }
}
