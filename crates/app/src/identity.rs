//! Trace and user correlation identifiers.

use console_relay_domain::{TraceId, UserId};
use console_relay_ports::Clock;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct IdentityState {
    trace_id: TraceId,
    user_id: UserId,
}

/// Holds the current trace id and user id.
///
/// State lives in memory only; a fresh manager always starts with a new trace
/// and the anonymous user.
pub struct IdentityManager {
    clock: Arc<dyn Clock>,
    state: Mutex<IdentityState>,
}

impl IdentityManager {
    /// Create a manager with a freshly generated trace.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let trace_id = generate_trace_id(clock.now_ms());
        Self {
            clock,
            state: Mutex::new(IdentityState {
                trace_id,
                user_id: UserId::anonymous(),
            }),
        }
    }

    /// Current trace id.
    pub fn trace_id(&self) -> TraceId {
        self.lock().trace_id.clone()
    }

    /// Replace the current trace id.
    pub fn set_trace_id(&self, trace_id: TraceId) {
        self.lock().trace_id = trace_id;
    }

    /// Rotate to a new trace and return it.
    pub fn new_trace(&self) -> TraceId {
        let trace_id = generate_trace_id(self.clock.now_ms());
        self.lock().trace_id = trace_id.clone();
        tracing::debug!(trace_id = %trace_id, "rotated trace");
        trace_id
    }

    /// Current user id.
    pub fn user_id(&self) -> UserId {
        self.lock().user_id.clone()
    }

    /// Replace the current user id. Setting the same id again is a no-op.
    pub fn set_user_id(&self, user_id: UserId) {
        let mut state = self.lock();
        if state.user_id != user_id {
            state.user_id = user_id;
        }
    }

    /// Revert to the anonymous user.
    pub fn clear_user(&self) {
        self.lock().user_id = UserId::anonymous();
    }

    /// Start over with a new trace and the anonymous user.
    pub fn reset(&self) {
        let trace_id = generate_trace_id(self.clock.now_ms());
        let mut state = self.lock();
        state.trace_id = trace_id;
        state.user_id = UserId::anonymous();
    }

    fn lock(&self) -> MutexGuard<'_, IdentityState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for IdentityManager {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        formatter
            .debug_struct("IdentityManager")
            .field("trace_id", &state.trace_id)
            .field("user_id", &state.user_id)
            .finish_non_exhaustive()
    }
}

/// Generate `trace_{epoch_ms}_{8 hex}` with the random part from a v4 UUID.
pub fn generate_trace_id(epoch_ms: u64) -> TraceId {
    let [a, b, c, d, ..] = *Uuid::new_v4().as_bytes();
    TraceId::generated(epoch_ms, u32::from_be_bytes([a, b, c, d]))
}
