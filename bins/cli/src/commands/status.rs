//! Status command handler.

use crate::error::CliError;
use crate::format::OutputMode;
use crate::{CliOutput, json_output};
use console_relay_config::ValidatedRelayConfig;

/// Run the status command.
pub fn run_status(mode: OutputMode, config: &ValidatedRelayConfig) -> Result<CliOutput, CliError> {
    if mode.is_json() {
        let payload = serde_json::json!({
            "status": "ok",
            "workerUrlFallback": config.worker_url_fallback(),
            "config": serde_json::to_value(config.as_ref())?,
        });
        return json_output(&payload);
    }
    Ok(CliOutput::ok(format_status_text(config)))
}

fn format_status_text(config: &ValidatedRelayConfig) -> String {
    let items = [
        ("enabled", bool_str(config.enabled).to_owned()),
        ("workerUrl", config.worker_url.to_string()),
        (
            "workerUrlFallback",
            config
                .worker_url_fallback()
                .map_or_else(|| "<none>".to_owned(), |rejected| format!("rejected {rejected}")),
        ),
        ("owner", bool_str(config.owner).to_owned()),
        ("duplicateWindowMs", config.duplicates.window_ms.to_string()),
        ("duplicateThreshold", config.duplicates.threshold.to_string()),
        ("quotaLimit", config.quota.limit.to_string()),
        ("quotaWindowMs", config.quota.window_ms.to_string()),
        (
            "chainProximityMs",
            config.correlation.chain_proximity_ms.to_string(),
        ),
        ("exportDir", config.export.output_dir.to_string()),
    ];

    let mut out = String::from("status: ok\n");
    for (key, value) in items {
        push_kv(&mut out, key, &value);
    }
    out
}

const fn bool_str(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

#[inline]
fn push_kv(out: &mut String, key: &str, value: &str) {
    out.push_str(key);
    out.push_str(": ");
    out.push_str(value);
    out.push('\n');
}
