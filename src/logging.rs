//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! The log level is resolved from the `OPSKIT_LOG` environment variable
//! (e.g. "info", "debug") and defaults to `info`.

use tracing_subscriber::fmt;

/// Initialise the global logging subscriber.
///
/// Call once at startup; a second call panics.
pub fn init() {
    let level = std::env::var("OPSKIT_LOG")
        .ok()
        .and_then(|s| parse_level(&s))
        .unwrap_or(tracing::Level::INFO);

    fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn parse_level(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}
