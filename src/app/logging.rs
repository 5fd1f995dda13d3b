use std::io;

use tracing_subscriber::EnvFilter;

use crate::app::config::LoggingSettings;

/// Every event is written while holding the stdout lock, so lines from
/// concurrently processed devices never interleave.
fn locked_stdout() -> io::StdoutLock<'static> {
    io::stdout().lock()
}

pub fn init_logging(settings: &LoggingSettings) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(settings.log_level.trim()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if settings.json {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(locked_stdout)
            .json()
            .with_target(false)
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(locked_stdout)
            .with_target(false)
            .try_init();
    }
}
