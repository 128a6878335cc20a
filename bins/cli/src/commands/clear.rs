//! Clear command handler.

use crate::error::CliError;
use crate::format::OutputMode;
use crate::{CliOutput, json_output};
use console_relay_app::clear_logs;
use console_relay_config::ValidatedRelayConfig;
use console_relay_infra::build_viewer;

/// Run the clear command.
pub async fn run_clear(
    mode: OutputMode,
    config: &ValidatedRelayConfig,
    confirmed: bool,
) -> Result<CliOutput, CliError> {
    if !confirmed {
        return Err(CliError::InvalidInput(
            "clearing deletes every stored log; pass --yes to confirm".to_owned(),
        ));
    }

    let viewer = build_viewer(config)?;
    let deleted = clear_logs(&viewer).await?;

    if mode.is_json() {
        let payload = serde_json::json!({ "status": "ok", "deleted": deleted });
        return json_output(&payload);
    }
    Ok(CliOutput::ok(format!("status: ok\ndeleted: {deleted}\n")))
}
