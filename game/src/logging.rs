use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "TYPESTRIKE_LOG";

/// 0 warn, 1 info, 2 debug, 3+ trace.
pub const fn verbosity_to_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Installs the stderr subscriber. `TYPESTRIKE_LOG` (EnvFilter syntax) wins
/// over `verbosity`. Later calls are ignored.
pub fn init_logging(verbosity: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(verbosity_to_directive(verbosity)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbosity >= 2)
        .with_writer(std::io::stderr)
        .try_init();
}
