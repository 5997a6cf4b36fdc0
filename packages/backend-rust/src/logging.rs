use std::path::PathBuf;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::env_bool;

const LOG_FILE_PREFIX: &str = "masterly.log";

/// Keeps the non-blocking file writer alive; drop it last.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

/// `LOG_DIR` (default `./logs`) when `ENABLE_FILE_LOGS` is set.
pub fn file_log_dir() -> Option<PathBuf> {
    if !env_bool("ENABLE_FILE_LOGS", false) {
        return None;
    }
    Some(
        std::env::var("LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./logs")),
    )
}

/// Stdout logging filtered by `log_level`, plus a daily-rotated file when
/// file logs are enabled and the directory is writable.
pub fn init_tracing(log_level: &str) -> Option<FileLogGuard> {
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_writer, guard) = match file_log_dir().map(open_file_writer) {
        Some(Ok((writer, guard))) => (Some(writer), Some(FileLogGuard { _guard: guard })),
        Some(Err(message)) => {
            eprintln!("{message}");
            (None, None)
        }
        None => (None, None),
    };

    let file_layer = file_writer.map(|writer| {
        fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .init();

    guard
}

fn open_file_writer(dir: PathBuf) -> Result<(NonBlocking, WorkerGuard), String> {
    std::fs::create_dir_all(&dir)
        .map_err(|err| format!("failed to create log directory {}: {err}", dir.display()))?;
    let appender = RollingFileAppender::new(Rotation::DAILY, &dir, LOG_FILE_PREFIX);
    Ok(tracing_appender::non_blocking(appender))
}
