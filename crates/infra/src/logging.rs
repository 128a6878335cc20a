//! Tracing subscriber setup.

use crate::tracing_layer::RelayLayer;
use crate::wiring::InfraResult;
use console_relay_shared::{ErrorCode, ErrorEnvelope};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

const DEFAULT_DIRECTIVE: &str = "info";

/// Diagnostic output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Subscriber options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TracingOptions {
    /// Output format on stderr.
    pub format: LogFormat,
    /// Filter used when `RUST_LOG` is unset or invalid.
    pub default_directive: &'static str,
    /// Forward events to the installed relay.
    pub forward_to_relay: bool,
}

impl Default for TracingOptions {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            default_directive: DEFAULT_DIRECTIVE,
            forward_to_relay: false,
        }
    }
}

/// Install the global subscriber: env filter, stderr fmt layer, and
/// optionally the relay bridge.
pub fn init_tracing(options: TracingOptions) -> InfraResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(options.default_directive));

    let fmt_layer = match options.format {
        LogFormat::Text => fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
    };
    let relay_layer = options.forward_to_relay.then(RelayLayer::global);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(relay_layer)
        .with(filter)
        .try_init()
        .map_err(|error| {
            ErrorEnvelope::unexpected(
                ErrorCode::internal(),
                format!("failed to install tracing subscriber: {error}"),
            )
        })
}
