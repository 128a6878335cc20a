//! Recent-traces command handler.

use crate::error::CliError;
use crate::format::OutputMode;
use crate::{CliOutput, json_output};
use console_relay_app::{format_timestamp, recent_traces};
use console_relay_config::ValidatedRelayConfig;
use console_relay_infra::build_viewer;
use std::fmt::Write as _;

/// Run the traces command.
pub async fn run_traces(
    mode: OutputMode,
    config: &ValidatedRelayConfig,
    limit: u32,
) -> Result<CliOutput, CliError> {
    let viewer = build_viewer(config)?;
    let listing = recent_traces(&viewer, limit).await?;

    if mode.is_json() {
        let payload = serde_json::json!({
            "status": "ok",
            "traces": listing.traces,
            "skipped": listing.skipped,
        });
        return json_output(&payload);
    }

    let mut out = String::new();
    if listing.traces.is_empty() {
        out.push_str("no traces stored\n");
    }
    for trace in &listing.traces {
        let systems: Vec<&str> = trace.systems.iter().map(|system| system.as_str()).collect();
        let _ = writeln!(
            out,
            "{}  {}  logs={}  systems={}{}",
            trace.id,
            format_timestamp(trace.timestamp),
            trace.log_count,
            if systems.is_empty() {
                "-".to_owned()
            } else {
                systems.join(",")
            },
            if trace.has_errors { "  errors" } else { "" },
        );
    }
    if listing.skipped > 0 {
        let _ = writeln!(out, "skipped {} malformed rows", listing.skipped);
    }
    Ok(CliOutput::ok(out))
}
