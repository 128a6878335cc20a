//! Integration coverage for domain primitives and stored entries.

use console_relay_domain::{PrimitiveError, StoredLogEntry, SystemTag, TraceId, UserId};
use console_relay_shared::ErrorEnvelope;
use proptest::prelude::*;
use serde_json::json;

#[test]
fn primitive_errors_map_into_error_envelopes() -> Result<(), PrimitiveError> {
    let Err(error) = TraceId::parse(" ") else {
        return Err(PrimitiveError::EmptyTraceId { input_length: 0 });
    };

    let envelope: ErrorEnvelope = error.into();
    assert_eq!(envelope.code.namespace(), "domain");
    assert_eq!(envelope.code.code(), "invalid_trace_id");
    assert_eq!(
        envelope.metadata.get("input_length"),
        Some(&"1".to_string())
    );

    let Err(system_error) = SystemTag::parse("mainframe") else {
        return Err(PrimitiveError::UnknownSystem {
            input: "mainframe".to_string(),
        });
    };
    let envelope: ErrorEnvelope = system_error.into();
    assert_eq!(envelope.code.code(), "unknown_system");
    assert_eq!(envelope.metadata.get("input"), Some(&"mainframe".to_string()));

    Ok(())
}

#[test]
fn stored_entry_without_user_defaults_to_anonymous() -> Result<(), serde_json::Error> {
    let entry: StoredLogEntry = serde_json::from_value(json!({
        "id": "1",
        "trace_id": "trace_5_0000",
        "timestamp": 5,
        "level": "info",
        "message": "ready",
        "system": "browser",
    }))?;
    assert!(entry.user_id.is_anonymous());
    assert!(!entry.is_problem());
    Ok(())
}

proptest! {
    #[test]
    fn blank_user_ids_are_rejected(blank in "[ \t\n]{0,8}") {
        prop_assert!(UserId::parse(&blank).is_err());
    }

    #[test]
    fn user_ids_are_trimmed(core in "[a-zA-Z0-9_@.-]{1,24}", pad in "[ ]{0,3}") {
        let parsed = UserId::parse(format!("{pad}{core}{pad}"));
        prop_assert!(parsed.is_ok());
        if let Ok(user) = parsed {
            prop_assert_eq!(user.as_str(), core.as_str());
        }
    }

    #[test]
    fn composed_trace_ids_parse_back(epoch in 0u64..4_000_000_000_000, suffix in "[0-9a-f]{8}") {
        let composed = TraceId::compose(epoch, &suffix);
        prop_assert!(composed.is_ok());
        if let Ok(trace) = composed {
            prop_assert!(trace.as_str().starts_with("trace_"));
            prop_assert!(trace.as_str().ends_with(suffix.as_str()));
            prop_assert_eq!(TraceId::parse(trace.as_str()), Ok(trace.clone()));
        }
    }
}
