use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

const LOG_FILE_PREFIX: &str = "vocab-trainer.log";
const DEFAULT_FILTER: &str = "info";

/// Where console log lines go. The interactive test prints questions on
/// stdout, so it logs to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleTarget {
    Stdout,
    Stderr,
}

pub struct FileLogGuard {
    _guard: WorkerGuard,
}

pub fn file_logging_enabled() -> bool {
    std::env::var("ENABLE_FILE_LOGS")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

fn env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber. Keep the returned guard alive for as
/// long as file logs should be flushed.
pub fn init_tracing(log_level: &str, console: ConsoleTarget) -> Option<FileLogGuard> {
    let mut layers: Vec<BoxedLayer> = Vec::with_capacity(2);
    layers.push(match console {
        ConsoleTarget::Stdout => fmt::layer().with_target(true).boxed(),
        ConsoleTarget::Stderr => fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
    });

    let guard = file_log_layer().map(|(layer, guard)| {
        layers.push(layer);
        FileLogGuard { _guard: guard }
    });

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter(log_level))
        .init();

    guard
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn file_log_layer() -> Option<(BoxedLayer, WorkerGuard)> {
    if !file_logging_enabled() {
        return None;
    }
    let log_dir = std::env::var("LOG_DIR").unwrap_or_else(|_| "./logs".to_string());
    if let Err(err) = std::fs::create_dir_all(&log_dir) {
        eprintln!("failed to create log directory {log_dir}: {err}");
        return None;
    }

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .boxed();
    Some((layer, guard))
}
