//! Logging initialization.
//!
//! Call [`init`] once at process start. The publisher itself only emits
//! `tracing` events under the span it was given; where they go is decided
//! here.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Fallback log level when `RUST_LOG` is unset.
pub const LOG_LEVEL_VAR: &str = "GRIDPOST_LOG_LEVEL";

const DEFAULT_LEVEL: &str = "info";

/// Build the log filter. Prefers `RUST_LOG`, then `GRIDPOST_LOG_LEVEL`.
fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = std::env::var(LOG_LEVEL_VAR).unwrap_or_else(|_| DEFAULT_LEVEL.to_string());
        EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))
    })
}

/// Install a JSON subscriber writing to stdout.
///
/// Fails if a global subscriber is already installed.
pub fn init() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(filter())
        .with(tracing_subscriber::fmt::layer().json())
        .try_init()?;

    Ok(())
}
