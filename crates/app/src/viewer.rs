//! Viewer use cases over the external log store.

use console_relay_domain::TraceId;
use console_relay_ports::{AccessPort, LogStorePort, RecentTraces, TraceLogs};
use console_relay_shared::{ErrorCode, ErrorEnvelope, Result};
use std::sync::Arc;

/// Dependencies required by the viewer use cases.
#[derive(Clone)]
pub struct ViewerDeps {
    /// Stored log reader.
    pub store: Arc<dyn LogStorePort>,
    /// Owner capability check.
    pub access: Arc<dyn AccessPort>,
}

/// Fetch every stored entry for a trace.
pub async fn load_trace(deps: &ViewerDeps, trace_id: &TraceId) -> Result<TraceLogs> {
    let logs = deps.store.trace_logs(trace_id).await?;
    if logs.skipped > 0 {
        tracing::warn!(
            trace_id = %trace_id,
            skipped = logs.skipped,
            "skipped malformed stored entries"
        );
    }
    tracing::debug!(trace_id = %trace_id, entries = logs.entries.len(), "loaded trace");
    Ok(logs)
}

/// List recent traces, newest first as the store returns them.
pub async fn recent_traces(deps: &ViewerDeps, limit: u32) -> Result<RecentTraces> {
    let traces = deps.store.recent_traces(limit.max(1)).await?;
    if traces.skipped > 0 {
        tracing::warn!(skipped = traces.skipped, "skipped malformed trace summaries");
    }
    Ok(traces)
}

/// Delete every stored entry. Only the owner may do this.
pub async fn clear_logs(deps: &ViewerDeps) -> Result<u64> {
    if !deps.access.is_owner() {
        return Err(ErrorEnvelope::expected(
            ErrorCode::permission_denied(),
            "only the owner may clear stored logs",
        )
        .with_metadata("operation", "clear_logs"));
    }

    let deleted = deps.store.clear_logs().await?;
    tracing::info!(deleted, "cleared stored logs");
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use console_relay_ports::BoxFuture;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FakeStore {
        cleared: AtomicBool,
    }

    impl LogStorePort for FakeStore {
        fn recent_traces(&self, limit: u32) -> BoxFuture<'_, Result<RecentTraces>> {
            Box::pin(async move {
                assert_eq!(limit, 1);
                Ok(RecentTraces::default())
            })
        }

        fn trace_logs<'a>(&'a self, _trace_id: &'a TraceId) -> BoxFuture<'a, Result<TraceLogs>> {
            Box::pin(async move {
                Ok(TraceLogs {
                    entries: Vec::new(),
                    skipped: 2,
                })
            })
        }

        fn clear_logs(&self) -> BoxFuture<'_, Result<u64>> {
            Box::pin(async move {
                self.cleared.store(true, Ordering::SeqCst);
                Ok(7)
            })
        }
    }

    struct Owner(bool);

    impl AccessPort for Owner {
        fn is_owner(&self) -> bool {
            self.0
        }
    }

    fn deps(owner: bool) -> (ViewerDeps, Arc<FakeStore>) {
        let store = Arc::new(FakeStore {
            cleared: AtomicBool::new(false),
        });
        let deps = ViewerDeps {
            store: Arc::clone(&store) as Arc<dyn LogStorePort>,
            access: Arc::new(Owner(owner)),
        };
        (deps, store)
    }

    #[tokio::test]
    async fn non_owner_cannot_clear() {
        let (deps, store) = deps(false);
        let error = clear_logs(&deps).await.err();
        assert_eq!(
            error.map(|error| error.code),
            Some(ErrorCode::permission_denied())
        );
        assert!(!store.cleared.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn owner_clears_and_gets_count() -> Result<()> {
        let (deps, store) = deps(true);
        assert_eq!(clear_logs(&deps).await?, 7);
        assert!(store.cleared.load(Ordering::SeqCst));
        Ok(())
    }

    #[tokio::test]
    async fn skipped_rows_are_passed_through() -> Result<()> {
        let (deps, _) = deps(false);
        let logs = load_trace(&deps, &TraceId::generated(1, 1)).await?;
        assert_eq!(logs.skipped, 2);
        Ok(())
    }

    #[tokio::test]
    async fn zero_limit_is_raised_to_one() -> Result<()> {
        let (deps, _) = deps(false);
        let traces = recent_traces(&deps, 0).await?;
        assert!(traces.traces.is_empty());
        Ok(())
    }
}
