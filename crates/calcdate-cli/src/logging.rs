//! Diagnostics on stderr, so stdout carries only results.

use tracing_subscriber::EnvFilter;

use crate::cli::LogLevel;

fn filter_for(level: LogLevel) -> EnvFilter {
    EnvFilter::new(level.as_filter_str())
}

/// Install the global tracing subscriber.
///
/// Level precedence: `--log-level`, then `CALCDATE_LOG`, then `warn`.
/// A subscriber that is already installed is left in place.
pub fn init_logging(level: LogLevel) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter_for(level))
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
