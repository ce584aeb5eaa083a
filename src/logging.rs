use std::fs;
use std::io::IsTerminal;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::constants::{DEFAULT_LOG_DIR, LOG_DIR_ENV};

/// Target for events that belong in the log file but not on the console
pub const FILE_ONLY_TARGET: &str = "order_cleaner::file_only";

const FILE_DEFAULT_FILTER: &str = "order_cleaner=info,warn";
const CONSOLE_DEFAULT_FILTER: &str = "warn,order_cleaner::file_only=off";

/// Initializes logging with a JSON file layer and a console layer on stderr.
///
/// Stdout is left for the run summary, so console logs go to stderr. Without
/// `RUST_LOG` the console only shows warnings, and colour is used only when
/// stderr is a terminal. The log directory defaults to `logs/` and can be
/// moved with `ORDER_CLEANER_LOG_DIR`.
pub fn init_logging() {
    let log_dir = std::env::var(LOG_DIR_ENV).unwrap_or_else(|_| DEFAULT_LOG_DIR.to_string());
    let _ = fs::create_dir_all(&log_dir);

    // Daily rotation, written off the main thread
    let file_appender = tracing_appender::rolling::daily(&log_dir, "order_cleaner.log");
    let (non_blocking_writer, _guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .json()
        .with_writer(non_blocking_writer)
        .with_filter(filter_or(FILE_DEFAULT_FILTER));

    let console_layer = fmt::layer()
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .with_filter(filter_or(CONSOLE_DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .init();

    // We need to keep the guard alive so buffered lines are flushed on exit
    std::mem::forget(_guard);
}

/// Respect RUST_LOG if set, otherwise fall back to `default`
fn filter_or(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}
