//! Tracing Subscriber Setup
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` and a fmt
//! layer writing to stderr. Stdout is reserved for the record stream.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: extra filter directives, applied after the defaults so a
//!   directive for the same target wins

use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Telemetry configuration.
#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig {
    /// Raise the crate's own level from `info` to `debug`.
    pub verbose: bool,
}

impl TelemetryConfig {
    /// Default directives for the crate and binary targets.
    #[must_use]
    pub fn directives(&self) -> Vec<Directive> {
        let level = if self.verbose { "debug" } else { "info" };
        ["bztcp_client", "bztcp"]
            .iter()
            .filter_map(|target| format!("{target}={level}").parse().ok())
            .collect()
    }
}

/// Install the global subscriber.
///
/// Returns `false` if a subscriber was already installed.
pub fn init(config: &TelemetryConfig) -> bool {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let env_filter = build_filter(config, rust_log.as_deref());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .is_ok()
}

/// Crate defaults followed by the comma-separated `rust_log` directives.
///
/// Unparsable directives are skipped.
fn build_filter(config: &TelemetryConfig, rust_log: Option<&str>) -> EnvFilter {
    let overrides = rust_log
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .filter_map(|d| d.parse::<Directive>().ok());

    config
        .directives()
        .into_iter()
        .chain(overrides)
        .fold(EnvFilter::default(), EnvFilter::add_directive)
}
