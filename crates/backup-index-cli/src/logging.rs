use std::env;
use std::ffi::OsStr;
use std::path::Path;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_PATH: &str = "./logs/backup-index.log";

/// `--debug` wins over `--verbose`, which wins over `TRACING_LEVEL`.
pub fn init_logger(debug: bool, verbose: bool, log_path: Option<&str>) -> impl Drop {
    let filter = if debug {
        "debug".to_string()
    } else if verbose {
        "info".to_string()
    } else {
        env::var("TRACING_LEVEL").unwrap_or_else(|_| "info".to_string())
    };
    let filter_layer = EnvFilter::new(filter);

    let log_file_path = log_path
        .map(str::to_string)
        .or_else(|| env::var("LOG_FILE_PATH").ok())
        .unwrap_or_else(|| DEFAULT_LOG_PATH.to_string());
    let log_file_path = Path::new(&log_file_path);
    let directory = log_file_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = log_file_path
        .file_name()
        .unwrap_or_else(|| OsStr::new("backup-index.log"));

    let file_appender = tracing_appender::rolling::never(directory, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .pretty()
                .with_file(false)
                .without_time()
                .with_ansi(true),
        )
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .with(filter_layer)
        .init();

    info!("Logging to stdout and {}", log_file_path.display());

    guard
}
