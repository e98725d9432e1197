//! Logging initialization and configuration.
//!
//! Two targets are used throughout the crate: `packet_console::loading` for
//! bootstrap work (scripts, extensions, session restore) and
//! `packet_console::interactive` for actions triggered from the prompt.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log levels from the most to the least verbose threshold.
const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

fn filter_for(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("packet_console={}", level)))
}

/// Initialize the logging system.
///
/// Uses the `RUST_LOG` environment variable for filtering. If not set,
/// defaults to `packet_console=<level>`.
///
/// # Panics
///
/// Panics if called more than once, or if another tracing subscriber
/// has already been set.
pub fn init(level: &str) {
    tracing_subscriber::registry()
        .with(filter_for(level))
        .with(tracing_subscriber::fmt::layer().compact())
        .init();
}

/// Try to initialize the logging system.
///
/// Returns `Ok(())` if successful, or `Err` if logging has already been
/// initialized.
pub fn try_init(level: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(filter_for(level))
        .with(tracing_subscriber::fmt::layer().compact())
        .try_init()
}

/// Lower the logging threshold by `steps` levels (`info` -> `debug` -> `trace`).
///
/// Unknown level names are treated as `info`. The threshold never goes below
/// `trace`.
pub fn lower_level(level: &str, steps: u8) -> &'static str {
    let current = LEVELS
        .iter()
        .position(|l| l.eq_ignore_ascii_case(level))
        .unwrap_or(2);
    LEVELS[current.saturating_sub(steps as usize)]
}
