//! Process-wide tracing subscriber setup
//!
//! A single place to configure `tracing` so every binary (the API server,
//! the background worker, future CLIs) logs the same way: structured JSON
//! when `telemetry.environment` says "production", human-readable otherwise,
//! always honouring `RUST_LOG`/`AGENT_BRAIN_LOG` for filtering.

use tracing_subscriber::EnvFilter;

/// Controls the output format and default verbosity of the global subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, colored output - suitable for local development
    Pretty,
    /// Newline-delimited JSON - suitable for log aggregation in production
    Json,
}

/// Initialize the global `tracing` subscriber
///
/// Safe to call once per process; a second call is a logic error in the
/// caller (the binary's `main`), not something this crate guards against,
/// since `tracing`'s own `set_global_default` already panics loudly on
/// double-init.
pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_env("AGENT_BRAIN_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Pretty => subscriber.init(),
    }
}
