//! # console-relay-app
//!
//! The interception pipeline (pattern matching, classification, identity,
//! limiting, dispatch) and the viewer side (correlation, export, store use
//! cases). This crate depends on `ports`, `domain`, and `shared`.

pub mod classifier;
pub mod correlation;
pub mod export;
pub mod identity;
pub mod interceptor;
pub mod limiter;
pub mod patterns;
pub mod serialize;
pub mod viewer;

/// Returns the app crate version.
#[must_use]
pub const fn app_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub use classifier::classify;
pub use correlation::{
    ChainSettings, ErrorChain, LogFilter, SystemFlowStep, compute_system_flow, filter_by_level,
    filter_by_system, group_error_chains, search, sort_chronological, sort_reverse_chronological,
};
pub use export::{
    ExportDeps, ExportDestination, ExportFormat, ExportReport, StructuredExport, export,
    export_file_name, format_timestamp, parse_structured_export, render_export,
};
pub use identity::{IdentityManager, generate_trace_id};
pub use interceptor::{
    CallSite, ConsoleInterceptor, DispatchOutcome, Emission, InterceptorDeps, RelayState,
};
pub use limiter::{DuplicateFilter, LimitDecision, Limiter, LimiterSettings, RateQuota, signature};
pub use patterns::{
    PatternCategory, PatternDescriptor, PatternError, PatternKind, PatternMatcher, PatternRule,
    RELAY_META_PREFIX,
};
pub use serialize::{format_console_args, mask_secrets};
pub use viewer::{ViewerDeps, clear_logs, load_trace, recent_traces};

#[cfg(test)]
mod tests {
    use super::*;
    use console_relay_domain::domain_crate_version;
    use console_relay_ports::ports_crate_version;
    use console_relay_shared::shared_crate_version;

    #[test]
    fn app_crate_compiles() {
        assert!(!app_crate_version().is_empty());
    }

    #[test]
    fn app_can_use_ports_domain_shared() {
        assert!(!ports_crate_version().is_empty());
        assert!(!domain_crate_version().is_empty());
        assert!(!shared_crate_version().is_empty());
    }
}
