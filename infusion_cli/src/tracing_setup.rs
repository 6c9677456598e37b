//! `tracing` subscriber setup: pretty console output by default, `--json`
//! switches to newline-delimited JSON; an optional rotating file sink mirrors
//! whichever is configured in `[logging]`.

use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

use crate::cli::FILE_GUARD;

fn rotation_from_str(s: Option<&str>) -> tracing_appender::rolling::Rotation {
    match s {
        Some("daily") => tracing_appender::rolling::Rotation::DAILY,
        Some("hourly") => tracing_appender::rolling::Rotation::HOURLY,
        _ => tracing_appender::rolling::Rotation::NEVER,
    }
}

/// Install the global `tracing` subscriber. Safe to call once per process;
/// subsequent calls are no-ops (`set_global_default` failures are ignored).
pub fn init_tracing(json: bool, log_level: &str, log_file: Option<&str>, rotation: Option<&str>) {
    static INIT: OnceLock<()> = OnceLock::new();
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

        let file_layer = log_file.map(|path| {
            let dir = std::path::Path::new(path)
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let file_name = std::path::Path::new(path)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "infusion.log".to_string());
            let appender =
                tracing_appender::rolling::RollingFileAppender::new(rotation_from_str(rotation), dir, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            non_blocking
        });

        let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
        let result = if json {
            match file_layer {
                Some(w) => subscriber.json().with_writer(w).try_init(),
                None => subscriber.json().try_init(),
            }
        } else {
            match file_layer {
                Some(w) => subscriber.with_writer(w).try_init(),
                None => subscriber.try_init(),
            }
        };
        if let Err(e) = result {
            eprintln!("Warning: failed to install tracing subscriber: {e}");
        }
    });
}
