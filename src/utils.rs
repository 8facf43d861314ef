use anyhow::Result;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use crate::constants::{LOG_TARGET_CRATE, VERBOSITY_NORMAL, VERBOSITY_SILENT, VERBOSITY_VERBOSE};

pub fn log_level(verbosity: &str) -> Level {
    match verbosity {
        VERBOSITY_SILENT => Level::ERROR,
        VERBOSITY_NORMAL => Level::INFO,
        VERBOSITY_VERBOSE => Level::DEBUG,
        _ => Level::INFO,
    }
}

/// Install the global subscriber. Logs go to stderr; stdout is reserved for
/// query output.
pub fn setup_logging(verbosity: &str) -> Result<()> {
    let level = log_level(verbosity);

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("{}={}", LOG_TARGET_CRATE, level.as_str().to_ascii_lowercase()).parse()?);

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

pub fn format_duration(seconds: f64) -> String {
    if seconds < 1.0 {
        format!("{:.0}ms", seconds * 1000.0)
    } else if seconds < 60.0 {
        format!("{:.1}s", seconds)
    } else {
        format!("{:.1}m", seconds / 60.0)
    }
}
