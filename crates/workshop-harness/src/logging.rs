//! Tracing subscriber installation.
//!
//! The harness only emits `tracing` events; whoever runs it decides where
//! they go. `RUST_LOG` always wins over the default directive.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_DIRECTIVE: &str = "workshop_harness=info";

/// Output format for the fmt subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable single lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

fn filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Install a global fmt subscriber.
///
/// Returns `false` when a subscriber was already installed, which makes the
/// call safe from every test and every scenario entry point.
pub fn init_tracing(default_directive: &str, format: LogFormat) -> bool {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter(default_directive))
        .with_target(true);
    match format {
        LogFormat::Pretty => builder.try_init().is_ok(),
        LogFormat::Json => builder.json().try_init().is_ok(),
    }
}
