use std::io;
use std::path::Path;

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// # Setup Logging
///
/// Configures the global `tracing` subscriber:
/// - `RUST_LOG` wins when set, otherwise `log_level` is used as the filter.
/// - Human-readable, colored output on stdout.
/// - JSON records in a daily rotating file `<log_dir>/<app_name>.<date>`.
///
/// The returned guard flushes the file writer on drop; keep it alive in `main`.
pub fn setup_logging(log_dir: &Path, log_level: &str, app_name: &str) -> io::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = rolling::daily(log_dir, app_name);
    let (non_blocking_appender, guard) = non_blocking(file_appender);

    let console_layer = fmt::layer().with_target(true).with_ansi(true);

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking_appender)
        .json();

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e))?;

    info!("Logging initialized with level: {}", log_level);
    Ok(guard)
}
