//! Ingestion boundary contract.

use crate::BoxFuture;
use console_relay_domain::LogRecord;
use console_relay_shared::Result;

/// Outcome of a delivered ingestion request.
///
/// A rate-limit answer is informational, not a failure, so it is modelled as a
/// value rather than an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestAck {
    /// The endpoint stored the record.
    Accepted {
        /// Remaining quota reported by the endpoint, if any.
        remaining_quota: Option<u32>,
    },
    /// The endpoint refused the record because the quota is exhausted.
    RateLimited {
        /// Authoritative remaining quota.
        remaining_quota: u32,
        /// Reason reported by the endpoint.
        error: Box<str>,
    },
}

/// Boundary contract for shipping records to the ingestion endpoint.
pub trait IngestPort: Send + Sync {
    /// Send a single record. Transport failures and non-2xx, non-429 answers
    /// are errors.
    fn send(&self, record: LogRecord) -> BoxFuture<'_, Result<IngestAck>>;
}
