//! Tracing subscriber setup.
//!
//! The worker's observability surface is structured logs: an
//! `EnvFilter` honoring `RUST_LOG` (default `info`) with either a
//! human-readable or JSON fmt layer.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global tracing subscriber.
///
/// Call once at startup, before any other worker component runs.
pub fn init_telemetry(log_json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
