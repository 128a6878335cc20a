//! Secret detection and redaction utilities.
//!
//! The sentinel defined here is the single token every redaction path in the
//! relay writes in place of a sensitive value.

/// The redacted placeholder string.
pub const REDACTED: &str = "[REDACTED]";

/// Checks if a key/field name likely refers to a secret.
///
/// # Examples
///
/// ```
/// use console_relay_shared::is_secret_key;
///
/// assert!(is_secret_key("apiKey"));
/// assert!(is_secret_key("password"));
/// assert!(is_secret_key("Authorization"));
/// assert!(!is_secret_key("page_url"));
/// ```
pub fn is_secret_key(key: &str) -> bool {
    let key = key.to_ascii_uppercase();
    key.contains("KEY")
        || key.contains("TOKEN")
        || key.contains("SECRET")
        || key.contains("PASSWORD")
        || key.contains("CREDENTIAL")
        || key.contains("AUTH")
        || key.contains("COOKIE")
}

/// Redacts a value if the key is likely a secret.
///
/// # Examples
///
/// ```
/// use console_relay_shared::redact_if_secret;
///
/// assert_eq!(redact_if_secret("session_token", "abc"), "[REDACTED]");
/// assert_eq!(redact_if_secret("level", "warn"), "warn");
/// ```
pub fn redact_if_secret(key: &str, value: &str) -> String {
    if is_secret_key(key) {
        REDACTED.to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_headers_count_as_secrets() {
        assert!(is_secret_key("Set-Cookie"));
        assert!(!is_secret_key("user_agent"));
    }

    #[test]
    fn redact_if_secret_keeps_plain_values() {
        assert_eq!(redact_if_secret("CLIENT_SECRET", "s3cr3t"), REDACTED);
        assert_eq!(redact_if_secret("trace_id", "trace_1_ab"), "trace_1_ab");
    }
}
