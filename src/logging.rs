use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::Res;

/// Initializes tracing for the collector.
///
/// Log lines always go to `log_path` (plain text, no ANSI codes). Unless
/// `background` is set they are mirrored to stdout as well. The level defaults
/// to INFO and can be overridden with `RUST_LOG`.
///
/// The returned guard flushes the file writer when dropped; keep it alive for
/// as long as the program runs.
pub fn init_logging(log_path: &Path, background: bool) -> Res<WorkerGuard> {
    let logs_dir = log_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(logs_dir)?;

    let file_name = log_path
        .file_name()
        .ok_or_else(|| format!("log path {} has no file name", log_path.display()))?;

    let file_appender = tracing_appender::rolling::never(logs_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false);

    let stdout_layer = (!background).then(|| fmt::layer().with_target(false));

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stdout_layer)
        .try_init()?;

    Ok(guard)
}

/// Initializes console-only tracing for the short-lived commands, so warnings
/// from the library (for example an ignored credential file) still surface.
pub fn init_console() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .try_init();
}
