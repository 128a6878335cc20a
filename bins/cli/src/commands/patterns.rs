//! Pattern inspection: `redact` and `patterns`.

use crate::error::CliError;
use crate::format::OutputMode;
use crate::{CliOutput, json_output};
use console_relay_infra::global;
use std::fmt::Write as _;

/// Run the redact command.
pub fn run_redact(
    mode: OutputMode,
    sample: &str,
    extra_patterns: &[String],
) -> Result<CliOutput, CliError> {
    for source in extra_patterns {
        global::add_redaction_pattern(source)?;
    }
    let redacted = global::test_redaction(sample);

    if mode.is_json() {
        let payload = serde_json::json!({
            "status": "ok",
            "redacted": redacted,
            "changed": redacted != sample,
        });
        return json_output(&payload);
    }
    Ok(CliOutput::ok(format!("{redacted}\n")))
}

/// Run the patterns command.
pub fn run_patterns(mode: OutputMode) -> Result<CliOutput, CliError> {
    let suppressed = global::suppressed_patterns();
    let sensitive = global::sensitive_patterns();

    if mode.is_json() {
        let payload = serde_json::json!({
            "status": "ok",
            "suppress": suppressed,
            "redact": sensitive,
        });
        return json_output(&payload);
    }

    let mut out = String::from("suppress:\n");
    for pattern in &suppressed {
        let _ = writeln!(
            out,
            "  {:<7} {:<10} {}",
            pattern.kind.to_string(),
            pattern.category.to_string(),
            pattern.source
        );
    }
    out.push_str("redact:\n");
    for source in &sensitive {
        let _ = writeln!(out, "  {source}");
    }
    Ok(CliOutput::ok(out))
}
