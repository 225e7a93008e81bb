use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub const LOG_FILE_NAME: &str = "orchestrator.log";

/// Initialize the logging system with the specified log level.
///
/// Always logs to stdout. When `log_dir` is given, logs are also written to
/// daily rotating files named `orchestrator.log.<date>` in that directory.
///
/// # Arguments
///
/// * `log_level` - An `EnvFilter` directive, e.g. "info" or "orchestrator=debug,tower_http=warn"
/// * `log_dir` - Optional directory for the rotating log file
pub fn init_logging(log_level: &str, log_dir: Option<&Path>) {
    let filter = match EnvFilter::try_new(log_level) {
        Ok(f) => f,
        Err(_) => {
            eprintln!("Invalid log level '{}', defaulting to 'info'", log_level);
            EnvFilter::new("info")
        }
    };

    let stdout_layer = fmt::layer().with_line_number(true);

    match log_dir {
        Some(dir) => {
            let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_NAME);

            let file_layer = fmt::layer()
                .with_ansi(false)
                .with_line_number(true)
                .with_writer(file_appender);

            tracing_subscriber::registry()
                .with(filter)
                .with(stdout_layer)
                .with(file_layer)
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stdout_layer)
                .init();
        }
    }
}
