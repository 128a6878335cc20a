//! # console-relay-infra
//!
//! Infrastructure wiring and runtime composition.
//! This crate depends on `app`, `adapters`, `config`, and `shared`.

/// Process-wide relay facade.
pub mod global;
/// Tracing subscriber setup.
pub mod logging;
/// Bridge from `tracing` events into the interceptor.
pub mod tracing_layer;
/// Adapter selection and settings mapping.
pub mod wiring;

pub use global::RelayStatus;
pub use logging::{LogFormat, TracingOptions, init_tracing};
pub use tracing_layer::RelayLayer;
pub use wiring::{
    InfraError, InfraResult, build_export_deps, build_interceptor, build_interceptor_with_state,
    build_viewer, chain_settings, limiter_settings, load_config,
};

/// Returns the infra crate version.
#[must_use]
pub const fn infra_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
