use color_eyre::{eyre::eyre, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::{self, LogConfig};

/// Install the global subscriber writing to a daily rolling file.
///
/// Stdout belongs to the session, so logs never go there. RUST_LOG takes
/// precedence over the configured level. Keep the guard alive until exit or
/// buffered lines are lost.
pub fn init(log: &LogConfig) -> Result<WorkerGuard> {
  let directory = match &log.directory {
    Some(dir) => dir.clone(),
    None => config::data_dir()?.join("logs"),
  };
  std::fs::create_dir_all(&directory)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", directory.display(), e))?;

  let appender = tracing_appender::rolling::daily(&directory, "photofeed.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = EnvFilter::try_from_default_env()
    .or_else(|_| EnvFilter::try_new(&log.level))
    .map_err(|e| eyre!("Invalid log level '{}': {}", log.level, e))?;

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .try_init()
    .map_err(|e| eyre!("Failed to install logger: {}", e))?;

  Ok(guard)
}
