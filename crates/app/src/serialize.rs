//! Console argument serialization.

use console_relay_shared::{REDACTED, is_secret_key};
use serde_json::Value;

/// Join console arguments into one message.
///
/// Strings are used raw, objects and arrays are pretty-printed with
/// secret-named keys masked, and every other value uses its JSON text.
pub fn format_console_args(args: &[Value]) -> String {
    args.iter()
        .map(format_arg)
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_arg(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Object(_) | Value::Array(_) => {
            let masked = mask_secrets(value.clone());
            serde_json::to_string_pretty(&masked).unwrap_or_else(|_| masked.to_string())
        },
        other => other.to_string(),
    }
}

/// Replace the value of every secret-named key, at any depth.
pub fn mask_secrets(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, inner)| {
                    if is_secret_key(&key) {
                        (key, Value::String(REDACTED.to_owned()))
                    } else {
                        (key, mask_secrets(inner))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(mask_secrets).collect()),
        other => other,
    }
}
