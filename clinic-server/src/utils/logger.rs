//! Logging Infrastructure
//!
//! Console or daily-rolling file output, plain text or JSON lines.

use std::path::Path;

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "clinic_server=info,tower_http=info";

/// Build the env filter: `RUST_LOG` wins, then `LOG_LEVEL`, then the default.
fn env_filter(log_level: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| match log_level {
        Some(level) if !level.is_empty() => {
            EnvFilter::new(format!("clinic_server={level},tower_http={level}"))
        }
        _ => EnvFilter::new(DEFAULT_FILTER),
    })
}

/// Initialize the global subscriber.
///
/// Returns the appender guard when logging to files; it must be held for the
/// life of the process or buffered lines are lost.
pub fn init_logger(
    log_level: Option<&str>,
    json: bool,
    log_dir: Option<&str>,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(log_level))
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false);

    if let Some(dir) = log_dir {
        let log_path = Path::new(dir);
        if std::fs::create_dir_all(log_path).is_ok() {
            let file_appender = tracing_appender::rolling::daily(log_path, "clinic-server");
            let (writer, guard) = tracing_appender::non_blocking(file_appender);
            let builder = builder.with_writer(writer).with_ansi(false);
            if json {
                builder.json().init();
            } else {
                builder.init();
            }
            return Some(guard);
        }
        eprintln!("Log directory {dir} is not writable, logging to stdout");
    }

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    None
}
