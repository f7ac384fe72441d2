//! Log sink setup: console plus `<log_dir>/run.log`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing_appender::non_blocking::{self, WorkerGuard};
use tracing_appender::rolling;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::error::{Error, Result};

/// File name of the run log inside the log directory.
pub const LOG_FILE: &str = "run.log";

/// Size at which the run log is moved aside before a new run starts.
pub const MAX_LOG_BYTES: u64 = 2 * 1024 * 1024;

/// Console filter: `RUST_LOG` when set, else `debug` or `info`.
pub fn console_filter(debug: bool) -> EnvFilter {
    let level = if debug { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install the global subscriber. Keep the returned guard alive until exit
/// so buffered file lines are flushed.
pub fn init_logging(debug: bool, log_dir: &Path) -> Result<WorkerGuard> {
    fs::create_dir_all(log_dir)?;
    rotate_if_large(log_dir)?;

    let file_appender = rolling::never(log_dir, LOG_FILE);
    let (file_writer, guard) = non_blocking::NonBlockingBuilder::default()
        .lossy(false)
        .finish(file_appender);

    let console_layer = fmt::layer()
        .with_target(false)
        .with_filter(console_filter(debug));

    let file_layer = fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(file_writer)
        .with_filter(LevelFilter::DEBUG);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))?;

    Ok(guard)
}

/// Move `run.log` to `run_<timestamp>.log` once it reached [`MAX_LOG_BYTES`].
/// Returns the archived path, if any.
pub fn rotate_if_large(log_dir: &Path) -> Result<Option<PathBuf>> {
    let current = log_dir.join(LOG_FILE);
    let size = match fs::metadata(&current) {
        Ok(meta) => meta.len(),
        Err(_) => return Ok(None),
    };
    if size < MAX_LOG_BYTES {
        return Ok(None);
    }

    let stamp = Utc::now().format("%Y%m%d_%H%M%S");
    let mut archived = log_dir.join(format!("run_{}.log", stamp));
    let mut n = 2;
    while archived.exists() {
        archived = log_dir.join(format!("run_{}_{}.log", stamp, n));
        n += 1;
    }

    fs::rename(&current, &archived)?;
    Ok(Some(archived))
}
