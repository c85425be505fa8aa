use std::path::Path;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::TutorConfig;

const LOG_FILE_PREFIX: &str = "tutor.log";

/// Flushes buffered file logs on drop; hold it until the process exits.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

/// Terminal logs go to stderr; stdout carries the interactive prompt.
/// File logs are added only when `config.log_dir` is set and creatable.
pub fn init_tracing(config: &TutorConfig) -> Option<FileLogGuard> {
    let env_filter =
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let terminal_layer = fmt::layer().with_target(true).with_writer(std::io::stderr);

    let (file_layer, guard) = match config.log_dir.as_deref().and_then(file_writer) {
        Some((writer, guard)) => {
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(FileLogGuard { _guard: guard }))
        }
        None => (None, None),
    };

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(terminal_layer)
        .with(file_layer)
        .try_init();
    if let Err(err) = installed {
        eprintln!("tracing subscriber already installed: {err}");
    }

    guard
}

fn file_writer(dir: &Path) -> Option<(NonBlocking, WorkerGuard)> {
    if let Err(err) = std::fs::create_dir_all(dir) {
        eprintln!("failed to create log directory {}: {err}", dir.display());
        return None;
    }
    let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
    Some(tracing_appender::non_blocking(appender))
}
