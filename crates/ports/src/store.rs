//! Read/clear boundary for the external log store.

use crate::BoxFuture;
use console_relay_domain::{StoredLogEntry, TraceId, TraceSummary};
use console_relay_shared::Result;

/// Entries for one trace, plus how many stored rows failed to parse.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraceLogs {
    /// Entries in the order the store returned them.
    pub entries: Vec<StoredLogEntry>,
    /// Count of malformed rows that were skipped.
    pub skipped: usize,
}

/// Recent traces, plus how many summaries failed to parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecentTraces {
    /// Summaries in store order.
    pub traces: Vec<TraceSummary>,
    /// Count of malformed summaries that were skipped.
    pub skipped: usize,
}

/// Boundary contract for the ingestion service's storage.
pub trait LogStorePort: Send + Sync {
    /// List the most recent traces.
    fn recent_traces(&self, limit: u32) -> BoxFuture<'_, Result<RecentTraces>>;

    /// Fetch every stored entry for a trace.
    fn trace_logs<'a>(&'a self, trace_id: &'a TraceId) -> BoxFuture<'a, Result<TraceLogs>>;

    /// Delete every stored entry and return how many were removed.
    fn clear_logs(&self) -> BoxFuture<'_, Result<u64>>;
}

/// Capability check consumed from the authentication system.
pub trait AccessPort: Send + Sync {
    /// True when the current user owns the deployment and may clear logs.
    fn is_owner(&self) -> bool;
}
