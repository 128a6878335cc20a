//! Log records flowing through the relay and entries read back from storage.

use crate::levels::{LogLevel, SystemTag};
use crate::primitives::{TraceId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Auxiliary key/value metadata attached at emission.
pub type LogContext = BTreeMap<String, Value>;

/// The unit flowing through the interception pipeline.
///
/// `message` holds the text after redaction; the raw text only ever reaches
/// the native console sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Trace the record belongs to.
    pub trace_id: TraceId,
    /// User id at emission time.
    pub user_id: UserId,
    /// Emission time in epoch milliseconds.
    pub timestamp: u64,
    /// Console level.
    pub level: LogLevel,
    /// Serialized, redacted message.
    pub message: String,
    /// Classified origin.
    pub system: SystemTag,
    /// Call-site stack, present for warn/error only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    /// Emission context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<LogContext>,
}

/// A record as stored by the ingestion service.
///
/// Fields the viewer does not model are kept in `extra` so that re-serializing
/// an entry never loses data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredLogEntry {
    /// Storage-assigned identifier.
    pub id: String,
    /// Trace the entry belongs to.
    pub trace_id: TraceId,
    /// User id recorded at ingestion.
    #[serde(default)]
    pub user_id: UserId,
    /// Emission time in epoch milliseconds.
    pub timestamp: u64,
    /// Console level.
    pub level: LogLevel,
    /// Stored message.
    pub message: String,
    /// Origin system.
    pub system: SystemTag,
    /// Call-site stack.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    /// Emission context, opaque to the viewer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    /// When the entry was synced to durable storage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synced_at: Option<u64>,
    /// Unmodelled fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl StoredLogEntry {
    /// Build a stored entry from a dispatched record.
    #[must_use]
    pub fn from_record(id: impl Into<String>, record: LogRecord) -> Self {
        Self {
            id: id.into(),
            trace_id: record.trace_id,
            user_id: record.user_id,
            timestamp: record.timestamp,
            level: record.level,
            message: record.message,
            system: record.system,
            stack: record.stack,
            context: record
                .context
                .map(|context| Value::Object(context.into_iter().collect())),
            synced_at: None,
            extra: BTreeMap::new(),
        }
    }

    /// True for warn and error entries.
    #[must_use]
    pub const fn is_problem(&self) -> bool {
        self.level.captures_stack()
    }
}

/// Summary row returned by the recent-traces listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceSummary {
    /// Trace identifier.
    pub id: TraceId,
    /// Timestamp of the most recent entry in the trace.
    pub timestamp: u64,
    /// Number of entries stored for the trace.
    pub log_count: u64,
    /// Systems that contributed entries.
    #[serde(default)]
    pub systems: Vec<SystemTag>,
    /// Whether any entry is an error.
    #[serde(default)]
    pub has_errors: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_omits_absent_optionals() -> Result<(), Box<dyn std::error::Error>> {
        let record = LogRecord {
            trace_id: TraceId::parse("trace_1_abcd")?,
            user_id: UserId::anonymous(),
            timestamp: 1,
            level: LogLevel::Log,
            message: "hello".to_string(),
            system: SystemTag::Browser,
            stack: None,
            context: None,
        };
        let value = serde_json::to_value(&record)?;
        assert_eq!(
            value,
            json!({
                "trace_id": "trace_1_abcd",
                "user_id": "anonymous",
                "timestamp": 1,
                "level": "log",
                "message": "hello",
                "system": "browser",
            })
        );
        Ok(())
    }

    #[test]
    fn stored_entry_keeps_unknown_fields() -> Result<(), serde_json::Error> {
        let raw = json!({
            "id": "log-1",
            "trace_id": "trace_1_abcd",
            "user_id": "u-7",
            "timestamp": 42,
            "level": "error",
            "message": "boom",
            "system": "backend",
            "synced_at": 50,
            "ttl_seconds": 3600,
        });
        let entry: StoredLogEntry = serde_json::from_value(raw.clone())?;
        assert_eq!(entry.extra.get("ttl_seconds"), Some(&json!(3600)));
        assert!(entry.is_problem());
        assert_eq!(serde_json::to_value(&entry)?, raw);
        Ok(())
    }

    #[test]
    fn stored_entry_rejects_blank_trace() {
        let raw = json!({
            "id": "log-1",
            "trace_id": "  ",
            "timestamp": 42,
            "level": "log",
            "message": "boom",
            "system": "browser",
        });
        assert!(serde_json::from_value::<StoredLogEntry>(raw).is_err());
    }

    #[test]
    fn trace_summary_uses_camel_case() -> Result<(), serde_json::Error> {
        let summary: TraceSummary = serde_json::from_value(json!({
            "id": "trace_9_ffff",
            "timestamp": 9,
            "logCount": 3,
            "systems": ["browser", "backend"],
            "hasErrors": true,
        }))?;
        assert_eq!(summary.log_count, 3);
        assert_eq!(summary.systems, vec![SystemTag::Browser, SystemTag::Backend]);
        Ok(())
    }
}
