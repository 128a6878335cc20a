//! The process-wide relay.
//!
//! One interceptor per process, installed from config. Until `install`
//! succeeds, and again after `reset`, [`console_sink`] hands out the native
//! sink that was current before installation, so callers that route output
//! through it see exactly the original behavior.

use crate::wiring::{InfraResult, build_interceptor_with_state};
use console_relay_adapters::{StdConsole, SystemClock};
use console_relay_app::{
    ConsoleInterceptor, LimiterSettings, PatternDescriptor, PatternRule, RelayState,
};
use console_relay_config::ValidatedRelayConfig;
use console_relay_domain::{TraceId, UserId};
use console_relay_ports::{ConsoleSink, IngestPort};
use console_relay_shared::ErrorEnvelope;
use serde::Serialize;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;

struct Relay {
    native: Arc<dyn ConsoleSink>,
    state: Arc<RelayState>,
    installed: Option<Installed>,
}

struct Installed {
    interceptor: ConsoleInterceptor,
    sink: Arc<dyn ConsoleSink>,
    previous_native: Arc<dyn ConsoleSink>,
}

static RELAY: LazyLock<Mutex<Relay>> = LazyLock::new(|| {
    Mutex::new(Relay {
        native: Arc::new(StdConsole),
        state: Arc::new(RelayState::new(
            Arc::new(SystemClock),
            LimiterSettings::default(),
        )),
        installed: None,
    })
});

fn relay() -> MutexGuard<'static, Relay> {
    RELAY.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Snapshot of the process-wide relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayStatus {
    /// An interceptor is installed.
    pub initialized: bool,
    /// The installed interceptor can reach the network.
    pub active: bool,
    /// Current trace.
    pub trace_id: TraceId,
    /// Current user.
    pub user_id: UserId,
}

impl Relay {
    fn status(&self) -> RelayStatus {
        RelayStatus {
            initialized: self.installed.is_some(),
            active: self
                .installed
                .as_ref()
                .is_some_and(|installed| installed.interceptor.is_active()),
            trace_id: self.state.identity.trace_id(),
            user_id: self.state.identity.user_id(),
        }
    }
}

/// Install the relay, shipping to the configured worker.
///
/// Installing twice is a no-op that returns the current status. A disabled
/// config installs nothing. Without a tokio runtime on the calling thread the
/// interceptor is installed inert: native output only.
pub fn install(config: &ValidatedRelayConfig) -> InfraResult<RelayStatus> {
    install_inner(config, None, None)
}

/// Install with an explicit ingest port and native sink.
pub fn install_with(
    config: &ValidatedRelayConfig,
    ingest: Arc<dyn IngestPort>,
    native: Arc<dyn ConsoleSink>,
) -> InfraResult<RelayStatus> {
    install_inner(config, Some(ingest), Some(native))
}

fn install_inner(
    config: &ValidatedRelayConfig,
    ingest: Option<Arc<dyn IngestPort>>,
    native: Option<Arc<dyn ConsoleSink>>,
) -> InfraResult<RelayStatus> {
    let runtime = Handle::try_current().ok();
    let mut relay = relay();
    if relay.installed.is_some() || !config.enabled {
        let status = relay.status();
        drop(relay);
        tracing::debug!(
            initialized = status.initialized,
            enabled = config.enabled,
            "relay install skipped"
        );
        return Ok(status);
    }

    let has_runtime = runtime.is_some();
    let native = native.unwrap_or_else(|| Arc::clone(&relay.native));
    let interceptor = build_interceptor_with_state(
        config,
        Arc::clone(&relay.state),
        ingest,
        Arc::clone(&native),
        runtime,
    )?;
    let previous_native = std::mem::replace(&mut relay.native, native);
    let sink: Arc<dyn ConsoleSink> = Arc::new(interceptor.clone());
    relay.installed = Some(Installed {
        interceptor,
        sink,
        previous_native,
    });
    let status = relay.status();
    drop(relay);

    if !has_runtime {
        tracing::warn!("no tokio runtime on the installing thread; relay is inert");
    }
    tracing::info!(
        trace_id = %status.trace_id,
        active = status.active,
        worker_url = %config.worker_url,
        "relay installed"
    );
    Ok(status)
}

/// Uninstall and restore the pre-install state.
pub fn reset() {
    let mut relay = relay();
    if let Some(installed) = relay.installed.take() {
        relay.native = installed.previous_native;
    }
    relay.state.reset();
    drop(relay);
    tracing::debug!("relay reset");
}

/// Current status.
pub fn status() -> RelayStatus {
    relay().status()
}

/// The sink console output should go through: the interceptor when
/// installed, the native sink otherwise.
pub fn console_sink() -> Arc<dyn ConsoleSink> {
    let relay = relay();
    relay.installed.as_ref().map_or_else(
        || Arc::clone(&relay.native),
        |installed| Arc::clone(&installed.sink),
    )
}

/// The installed interceptor, if any.
pub fn interceptor() -> Option<ConsoleInterceptor> {
    relay()
        .installed
        .as_ref()
        .map(|installed| installed.interceptor.clone())
}

fn state() -> Arc<RelayState> {
    Arc::clone(&relay().state)
}

/// Current trace id.
pub fn trace_id() -> TraceId {
    state().identity.trace_id()
}

/// Start a new trace and return its id.
pub fn new_trace() -> TraceId {
    state().identity.new_trace()
}

/// Attach a user id to subsequent records.
pub fn set_user_id(user_id: &str) -> InfraResult<()> {
    let user_id = UserId::parse(user_id).map_err(ErrorEnvelope::from)?;
    state().identity.set_user_id(user_id);
    Ok(())
}

/// Add a suppression rule.
pub fn add_suppression_pattern(rule: PatternRule) {
    state().patterns.add_suppression_pattern(rule);
}

/// Remove a suppression rule by source text.
pub fn remove_suppression_pattern(source: &str) -> bool {
    state().patterns.remove_suppression_pattern(source)
}

/// Add a redaction regex with exactly one capture group.
pub fn add_redaction_pattern(source: &str) -> InfraResult<()> {
    state()
        .patterns
        .add_redaction_pattern(source)
        .map_err(ErrorEnvelope::from)
}

/// Active suppression rules.
pub fn suppressed_patterns() -> Vec<PatternDescriptor> {
    state().patterns.suppressed_patterns()
}

/// Active redaction regex sources.
pub fn sensitive_patterns() -> Vec<String> {
    state().patterns.sensitive_patterns()
}

/// Apply the active redaction rules to `sample`.
pub fn test_redaction(sample: &str) -> String {
    state().patterns.test_redaction(sample)
}
