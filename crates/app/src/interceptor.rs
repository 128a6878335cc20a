//! Console interception pipeline.
//!
//! Every call echoes to the native sink first, then runs
//! classify -> suppress -> redact -> limit and, when allowed, spawns a
//! fire-and-forget dispatch on the captured runtime. Dispatch problems are
//! reported through the native sink only, so the pipeline never re-enters
//! itself.

use crate::classifier::classify;
use crate::identity::IdentityManager;
use crate::limiter::{LimitDecision, Limiter, LimiterSettings, signature};
use crate::patterns::{PatternMatcher, RELAY_META_PREFIX};
use crate::serialize::format_console_args;
use console_relay_domain::{LogContext, LogLevel, LogRecord, SystemTag};
use console_relay_ports::{Clock, ConsoleSink, IngestAck, IngestPort};
use console_relay_shared::ErrorEnvelope;
use serde_json::Value;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::panic::Location;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Mutable pipeline state shared by every interceptor of one relay.
#[derive(Debug)]
pub struct RelayState {
    /// Trace and user identifiers.
    pub identity: IdentityManager,
    /// Suppression and redaction rules.
    pub patterns: PatternMatcher,
    /// Duplicate filter and quota.
    pub limiter: Limiter,
}

impl RelayState {
    /// Fresh state with built-in patterns and a new trace.
    pub fn new(clock: Arc<dyn Clock>, settings: LimiterSettings) -> Self {
        Self {
            identity: IdentityManager::new(clock),
            patterns: PatternMatcher::new(),
            limiter: Limiter::new(settings),
        }
    }

    /// Clear identity, limiter, and runtime pattern additions.
    pub fn reset(&self) {
        self.identity.reset();
        self.patterns.reset_to_defaults();
        self.limiter.reset();
    }
}

/// Collaborators of the interceptor.
#[derive(Clone)]
pub struct InterceptorDeps {
    /// Ingestion endpoint.
    pub ingest: Arc<dyn IngestPort>,
    /// Console output captured before installation.
    pub native: Arc<dyn ConsoleSink>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
}

/// Source location attached to warn/error stacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    /// Source file.
    pub file: &'static str,
    /// Line number.
    pub line: u32,
}

impl From<&'static Location<'static>> for CallSite {
    fn from(location: &'static Location<'static>) -> Self {
        Self {
            file: location.file(),
            line: location.line(),
        }
    }
}

/// What happened to one console call.
#[derive(Debug)]
#[must_use]
pub enum Emission {
    /// The interceptor is disabled or has no runtime.
    Inert,
    /// A suppression rule matched; nothing was shipped.
    Suppressed,
    /// Dropped by the duplicate filter.
    Duplicate,
    /// Dropped because the local quota is exhausted.
    RateLimited {
        /// When the quota refills.
        reset_at_ms: u64,
    },
    /// A dispatch task was spawned.
    Dispatched(JoinHandle<DispatchOutcome>),
}

impl Emission {
    /// True when a dispatch task was spawned.
    pub const fn is_dispatched(&self) -> bool {
        matches!(self, Self::Dispatched(_))
    }

    /// Wait for the dispatch task, if any, and return its outcome.
    pub async fn settled(self) -> Option<DispatchOutcome> {
        match self {
            Self::Dispatched(handle) => handle.await.ok(),
            _ => None,
        }
    }
}

/// Result of a dispatch task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The endpoint stored the record.
    Accepted,
    /// The endpoint refused the record on quota grounds.
    RateLimited {
        /// Remaining quota reported by the endpoint.
        remaining_quota: u32,
    },
    /// Transport or protocol failure; already reported to the native sink.
    Failed(ErrorEnvelope),
}

/// Logging facade that ships console output to the ingestion endpoint.
#[derive(Clone)]
pub struct ConsoleInterceptor {
    state: Arc<RelayState>,
    deps: InterceptorDeps,
    runtime: Option<Handle>,
    enabled: bool,
    base_context: Option<LogContext>,
    system: Option<SystemTag>,
}

impl ConsoleInterceptor {
    /// Build an interceptor. Without a runtime handle, or when disabled, every
    /// call only echoes to the native sink.
    pub fn new(
        state: Arc<RelayState>,
        deps: InterceptorDeps,
        runtime: Option<Handle>,
        enabled: bool,
    ) -> Self {
        Self {
            state,
            deps,
            runtime,
            enabled,
            base_context: None,
            system: None,
        }
    }

    /// Attach context merged into every record.
    #[must_use]
    pub fn with_context(mut self, context: LogContext) -> Self {
        self.base_context = Some(context);
        self
    }

    /// Tag every record with `system` instead of classifying it.
    #[must_use]
    pub const fn with_system(mut self, system: SystemTag) -> Self {
        self.system = Some(system);
        self
    }

    /// True when calls can reach the network.
    pub const fn is_active(&self) -> bool {
        self.enabled && self.runtime.is_some()
    }

    /// Shared pipeline state.
    pub const fn state(&self) -> &Arc<RelayState> {
        &self.state
    }

    /// The sink captured at construction.
    pub fn native_sink(&self) -> Arc<dyn ConsoleSink> {
        Arc::clone(&self.deps.native)
    }

    /// `console.log`.
    #[track_caller]
    pub fn log(&self, message: &str) -> Emission {
        self.emit(LogLevel::Log, message, None)
    }

    /// `console.info`.
    #[track_caller]
    pub fn info(&self, message: &str) -> Emission {
        self.emit(LogLevel::Info, message, None)
    }

    /// `console.warn`.
    #[track_caller]
    pub fn warn(&self, message: &str) -> Emission {
        self.emit(LogLevel::Warn, message, None)
    }

    /// `console.error`.
    #[track_caller]
    pub fn error(&self, message: &str) -> Emission {
        self.emit(LogLevel::Error, message, None)
    }

    /// `console.log` with structured arguments.
    #[track_caller]
    pub fn log_values(&self, args: &[Value]) -> Emission {
        self.emit_values(LogLevel::Log, args)
    }

    /// `console.info` with structured arguments.
    #[track_caller]
    pub fn info_values(&self, args: &[Value]) -> Emission {
        self.emit_values(LogLevel::Info, args)
    }

    /// `console.warn` with structured arguments.
    #[track_caller]
    pub fn warn_values(&self, args: &[Value]) -> Emission {
        self.emit_values(LogLevel::Warn, args)
    }

    /// `console.error` with structured arguments.
    #[track_caller]
    pub fn error_values(&self, args: &[Value]) -> Emission {
        self.emit_values(LogLevel::Error, args)
    }

    /// Serialize `args` and emit them as one message.
    #[track_caller]
    pub fn emit_values(&self, level: LogLevel, args: &[Value]) -> Emission {
        let message = format_console_args(args);
        self.emit(level, &message, None)
    }

    /// Echo to the native sink, then run the pipeline.
    #[track_caller]
    pub fn emit(&self, level: LogLevel, message: &str, context: Option<LogContext>) -> Emission {
        self.deps.native.write(level, message);
        self.observe(level, message, Some(Location::caller().into()), context)
    }

    /// Run the pipeline for output that was already printed elsewhere.
    pub fn observe(
        &self,
        level: LogLevel,
        message: &str,
        call_site: Option<CallSite>,
        context: Option<LogContext>,
    ) -> Emission {
        let Some(runtime) = self.runtime.as_ref().filter(|_| self.enabled) else {
            return Emission::Inert;
        };

        let system = self.system.unwrap_or_else(|| classify(message));
        if self.state.patterns.should_suppress(message) {
            return Emission::Suppressed;
        }

        let redacted = self.state.patterns.redact(message);
        let now_ms = self.deps.clock.now_ms();
        match self
            .state
            .limiter
            .should_emit(&signature(level, &redacted), now_ms)
        {
            LimitDecision::Allow => {},
            LimitDecision::Duplicate => return Emission::Duplicate,
            LimitDecision::RateLimited { reset_at_ms } => {
                return Emission::RateLimited { reset_at_ms };
            },
        }

        let record = LogRecord {
            trace_id: self.state.identity.trace_id(),
            user_id: self.state.identity.user_id(),
            timestamp: now_ms,
            level,
            message: redacted,
            system,
            stack: level.captures_stack().then(|| capture_stack(call_site)),
            context: self.merge_context(context),
        };

        let handle = runtime.spawn(dispatch(
            self.deps.clone(),
            Arc::clone(&self.state),
            record,
        ));
        Emission::Dispatched(handle)
    }

    fn merge_context(&self, context: Option<LogContext>) -> Option<LogContext> {
        match (self.base_context.clone(), context) {
            (None, None) => None,
            (Some(base), None) => Some(base),
            (None, Some(extra)) => Some(extra),
            (Some(mut base), Some(extra)) => {
                base.extend(extra);
                Some(base)
            },
        }
    }
}

impl ConsoleSink for ConsoleInterceptor {
    #[track_caller]
    fn write(&self, level: LogLevel, message: &str) {
        let _ = self.emit(level, message, None);
    }
}

impl std::fmt::Debug for ConsoleInterceptor {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ConsoleInterceptor")
            .field("enabled", &self.enabled)
            .field("has_runtime", &self.runtime.is_some())
            .finish_non_exhaustive()
    }
}

async fn dispatch(
    deps: InterceptorDeps,
    state: Arc<RelayState>,
    record: LogRecord,
) -> DispatchOutcome {
    match deps.ingest.send(record).await {
        Ok(IngestAck::Accepted { remaining_quota }) => {
            if let Some(remaining) = remaining_quota {
                state.limiter.sync_remaining(remaining);
            }
            DispatchOutcome::Accepted
        },
        Ok(IngestAck::RateLimited {
            remaining_quota,
            error,
        }) => {
            state
                .limiter
                .apply_rate_limit(remaining_quota, deps.clock.now_ms());
            deps.native.write(
                LogLevel::Warn,
                &format!(
                    "{RELAY_META_PREFIX} rate limited by ingestion endpoint: {error} \
                     (remaining quota {remaining_quota})"
                ),
            );
            DispatchOutcome::RateLimited { remaining_quota }
        },
        Err(error) => {
            deps.native.write(
                LogLevel::Error,
                &format!("{RELAY_META_PREFIX} failed to ship log: {error}"),
            );
            DispatchOutcome::Failed(error)
        },
    }
}

fn capture_stack(call_site: Option<CallSite>) -> String {
    let mut stack = call_site.map_or_else(
        || "at <unknown>".to_owned(),
        |site| format!("at {}:{}", site.file, site.line),
    );
    let backtrace = Backtrace::capture();
    if backtrace.status() == BacktraceStatus::Captured {
        stack.push('\n');
        stack.push_str(&backtrace.to_string());
    }
    stack
}
