//! Builds app dependencies from a validated config.

use console_relay_adapters::{
    FsExportWriter, Osc52Clipboard, StaticAccess, SystemClock, WorkerClient,
};
use console_relay_app::{
    ChainSettings, ConsoleInterceptor, ExportDeps, InterceptorDeps, LimiterSettings, RelayState,
    ViewerDeps,
};
use console_relay_config::{RelayConfig, ValidatedRelayConfig, load_relay_config_std_env};
use console_relay_ports::{ConsoleSink, IngestPort};
use console_relay_shared::ErrorEnvelope;
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::Handle;

/// Infra-level error type (shared error envelope).
pub type InfraError = ErrorEnvelope;

/// Infra-level result type.
pub type InfraResult<T> = Result<T, InfraError>;

/// Load the effective config from an optional file plus process env.
pub fn load_config(config_path: Option<&Path>) -> InfraResult<ValidatedRelayConfig> {
    load_relay_config_std_env(config_path)
}

/// Duplicate and quota settings from config.
#[must_use]
pub fn limiter_settings(config: &RelayConfig) -> LimiterSettings {
    LimiterSettings {
        duplicate_window_ms: config.duplicates.window_ms,
        duplicate_threshold: config.duplicates.threshold,
        max_signatures: usize::try_from(config.duplicates.max_signatures).unwrap_or(usize::MAX),
        quota_limit: config.quota.limit,
        quota_window_ms: config.quota.window_ms,
    }
}

/// Error-chain settings from config.
#[must_use]
pub fn chain_settings(config: &RelayConfig) -> ChainSettings {
    ChainSettings {
        proximity_ms: config.correlation.chain_proximity_ms,
        min_entries: usize::try_from(config.correlation.min_chain_entries).unwrap_or(usize::MAX),
        require_cross_system: config.correlation.require_cross_system,
    }
}

/// Build an interceptor over fresh pipeline state.
///
/// Pass `None` for `ingest` to ship to the configured worker.
pub fn build_interceptor(
    config: &RelayConfig,
    ingest: Option<Arc<dyn IngestPort>>,
    native: Arc<dyn ConsoleSink>,
    runtime: Option<Handle>,
) -> InfraResult<ConsoleInterceptor> {
    let state = Arc::new(RelayState::new(
        Arc::new(SystemClock),
        limiter_settings(config),
    ));
    build_interceptor_with_state(config, state, ingest, native, runtime)
}

/// Build an interceptor over existing pipeline state.
///
/// Identity and pattern rules are kept; the limiter switches to the
/// configured settings.
pub fn build_interceptor_with_state(
    config: &RelayConfig,
    state: Arc<RelayState>,
    ingest: Option<Arc<dyn IngestPort>>,
    native: Arc<dyn ConsoleSink>,
    runtime: Option<Handle>,
) -> InfraResult<ConsoleInterceptor> {
    let ingest = match ingest {
        Some(ingest) => ingest,
        None => Arc::new(WorkerClient::from_config(config)?),
    };
    state.limiter.reconfigure(limiter_settings(config));
    let deps = InterceptorDeps {
        ingest,
        native,
        clock: Arc::new(SystemClock),
    };
    Ok(ConsoleInterceptor::new(state, deps, runtime, config.enabled))
}

/// Viewer dependencies backed by the configured worker.
pub fn build_viewer(config: &RelayConfig) -> InfraResult<ViewerDeps> {
    Ok(ViewerDeps {
        store: Arc::new(WorkerClient::from_config(config)?),
        access: Arc::new(StaticAccess::from_config(config)),
    })
}

/// Export dependencies: OSC 52 on stdout and the configured output dir.
#[must_use]
pub fn build_export_deps(config: &RelayConfig) -> ExportDeps {
    ExportDeps {
        clipboard: Arc::new(Osc52Clipboard::stdout()),
        files: Arc::new(FsExportWriter::from_config(config)),
    }
}
