//! Logging setup.
//!
//! Maps the configured level onto a `tracing` filter and installs console
//! and optional file sinks. When a file sink is configured, a previous log
//! larger than the rotation threshold is rotated aside before writing.

use crate::config::LogConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Parses a configured level name. Unknown names fall back to `INFO`.
pub fn parse_level(level: &str) -> LevelFilter {
    match level.to_ascii_uppercase().as_str() {
        "DEBUG" => LevelFilter::DEBUG,
        "INFO" => LevelFilter::INFO,
        "WARNING" => LevelFilter::WARN,
        // FATAL has no tracing counterpart; both map onto ERROR.
        "ERROR" | "FATAL" => LevelFilter::ERROR,
        _ => LevelFilter::INFO,
    }
}

/// Installs the global subscriber.
///
/// Returns the file sink's worker guard, which must be held for the life of
/// the process to flush buffered lines. Safe to call more than once; later
/// calls are no-ops.
pub fn init(config: &LogConfig) -> Option<WorkerGuard> {
    let level = parse_level(&config.log_level);
    let console = tracing_subscriber::fmt::layer().with_filter(level);

    let mut guard = None;
    let file_layer = config.log_file.as_ref().and_then(|path| {
        rotate_if_oversized(path, config.max_log_file_size_in_mb);
        let directory = path.parent().unwrap_or_else(|| std::path::Path::new("."));
        let file_name = path.file_name()?;
        let appender = tracing_appender::rolling::never(directory, file_name);
        let (writer, worker_guard) = tracing_appender::non_blocking(appender);
        guard = Some(worker_guard);
        Some(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(level),
        )
    });

    let result = tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init();
    if result.is_err() {
        // A subscriber is already installed (tests, embedding applications).
        return None;
    }
    guard
}

/// Moves `path` aside to `path.old` when it exceeds the size threshold.
fn rotate_if_oversized(path: &std::path::Path, max_size_mb: f32) {
    let threshold = (max_size_mb * 1024.0 * 1024.0) as u64;
    let Ok(metadata) = std::fs::metadata(path) else {
        return;
    };
    if metadata.len() >= threshold {
        let mut rotated = path.as_os_str().to_owned();
        rotated.push(".old");
        if let Err(e) = std::fs::rename(path, &rotated) {
            eprintln!("failed to rotate log file {}: {}", path.display(), e);
        }
    }
}
