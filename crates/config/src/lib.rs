//! # console-relay-config
//!
//! Configuration schema, env overrides, validation, and normalization for the
//! relay. This crate depends on `shared` only.

/// Environment variable parsing and merging.
pub mod env;
/// Config loading helpers (env + file).
pub mod load;
/// Configuration schema types and helpers.
pub mod schema;

pub use env::{EnvParseError, RelayEnv, apply_env_overrides};
pub use load::{
    load_relay_config_from_path, load_relay_config_from_sources, load_relay_config_std_env,
    to_pretty_json, to_pretty_toml,
};
pub use schema::{
    CURRENT_CONFIG_VERSION, ConfigSchemaError, CorrelationConfig, DEFAULT_WORKER_URL,
    DuplicatesConfig, ExportConfig, QuotaConfig, RelayConfig, ValidatedRelayConfig,
    parse_relay_config_json, parse_relay_config_toml,
};

/// Returns the config crate version.
#[must_use]
pub const fn config_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
