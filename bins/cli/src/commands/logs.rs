//! Trace inspection: listing, chains, flow, and export.

use crate::error::{CliError, ExitCode};
use crate::format::OutputMode;
use crate::{CliOutput, json_output};
use console_relay_adapters::SystemClock;
use console_relay_app::{
    ExportDestination, ExportFormat, ExportReport, LogFilter, compute_system_flow, export,
    format_timestamp, group_error_chains, load_trace, render_export, sort_chronological,
    sort_reverse_chronological,
};
use console_relay_config::ValidatedRelayConfig;
use console_relay_domain::{LogLevel, StoredLogEntry, SystemTag, TraceId};
use console_relay_infra::{build_export_deps, build_viewer, chain_settings};
use console_relay_ports::Clock;
use std::fmt::Write as _;

/// Logs command input.
#[derive(Debug)]
pub struct LogsCommandInput<'a> {
    pub trace: &'a TraceId,
    pub systems: &'a [SystemTag],
    pub levels: &'a [LogLevel],
    pub search: Option<&'a str>,
    pub reverse: bool,
    pub format: Option<ExportFormat>,
    pub copy: bool,
    pub save: bool,
}

impl LogsCommandInput<'_> {
    fn filter(&self) -> LogFilter {
        LogFilter {
            systems: self.systems.iter().copied().collect(),
            levels: self.levels.iter().copied().collect(),
            text: self.search.map(str::to_owned),
        }
    }

    fn destinations(&self) -> Vec<ExportDestination> {
        let mut destinations = Vec::new();
        if self.copy {
            destinations.push(ExportDestination::Clipboard);
        }
        if self.save {
            destinations.push(ExportDestination::File);
        }
        destinations
    }
}

/// Run the logs command.
pub async fn run_logs(
    mode: OutputMode,
    config: &ValidatedRelayConfig,
    input: &LogsCommandInput<'_>,
) -> Result<CliOutput, CliError> {
    let viewer = build_viewer(config)?;
    let loaded = load_trace(&viewer, input.trace).await?;
    let mut entries = input.filter().apply(&loaded.entries);
    if input.reverse {
        sort_reverse_chronological(&mut entries);
    } else {
        sort_chronological(&mut entries);
    }

    let destinations = input.destinations();
    if !destinations.is_empty() {
        let format = input.format.unwrap_or(ExportFormat::Text);
        return export_entries(mode, config, &entries, format, &destinations);
    }

    let now_ms = SystemClock.now_ms();
    if mode.is_json() {
        let payload = serde_json::json!({
            "status": "ok",
            "traceId": input.trace,
            "count": entries.len(),
            "total": loaded.entries.len(),
            "skipped": loaded.skipped,
            "logs": entries,
        });
        return json_output(&payload);
    }
    if let Some(format) = input.format {
        return Ok(CliOutput::ok(render_export(&entries, format, now_ms)?));
    }
    Ok(CliOutput::ok(format_listing(&entries, loaded.skipped)))
}

fn export_entries(
    mode: OutputMode,
    config: &ValidatedRelayConfig,
    entries: &[StoredLogEntry],
    format: ExportFormat,
    destinations: &[ExportDestination],
) -> Result<CliOutput, CliError> {
    let deps = build_export_deps(config);
    let now_ms = SystemClock.now_ms();
    let reports = destinations
        .iter()
        .map(|destination| export(&deps, entries, format, *destination, now_ms))
        .collect::<Result<Vec<ExportReport>, _>>()?;
    let all_delivered = reports.iter().all(|report| report.delivered);

    let stdout = if mode.is_json() {
        let payload = serde_json::json!({
            "status": if all_delivered { "ok" } else { "partial" },
            "exports": reports,
        });
        let mut out = serde_json::to_string_pretty(&payload)?;
        out.push('\n');
        out
    } else {
        let mut out = String::new();
        for report in &reports {
            let _ = write!(
                out,
                "{} {} entries as {} to {}",
                if report.delivered { "exported" } else { "failed to export" },
                report.count,
                report.format.as_str(),
                report.destination.as_str(),
            );
            if let Some(location) = &report.location {
                let _ = write!(out, " ({})", location.display());
            }
            out.push('\n');
        }
        out
    };

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: if all_delivered {
            ExitCode::Ok
        } else {
            ExitCode::Io
        },
    })
}

fn format_listing(entries: &[StoredLogEntry], skipped: usize) -> String {
    let mut out = String::new();
    for entry in entries {
        let _ = writeln!(
            out,
            "{} {:<5} [{}] {}",
            format_timestamp(entry.timestamp),
            entry.level.as_str().to_ascii_uppercase(),
            entry.system,
            entry.message
        );
    }
    let _ = writeln!(out, "{} entries", entries.len());
    if skipped > 0 {
        let _ = writeln!(out, "skipped {skipped} malformed rows");
    }
    out
}

/// Run the chains command.
pub async fn run_chains(
    mode: OutputMode,
    config: &ValidatedRelayConfig,
    trace: &TraceId,
    proximity_ms: Option<u64>,
) -> Result<CliOutput, CliError> {
    let mut settings = chain_settings(config);
    if let Some(proximity_ms) = proximity_ms {
        settings.proximity_ms = proximity_ms;
    }

    let viewer = build_viewer(config)?;
    let loaded = load_trace(&viewer, trace).await?;
    let chains = group_error_chains(&loaded.entries, settings);

    if mode.is_json() {
        let payload = serde_json::json!({
            "status": "ok",
            "traceId": trace,
            "proximityMs": settings.proximity_ms,
            "chains": chains,
        });
        return json_output(&payload);
    }

    let mut out = String::new();
    if chains.is_empty() {
        out.push_str("no error chains\n");
    }
    for chain in &chains {
        out.push_str(&chain.label);
        out.push('\n');
        for entry in &chain.entries {
            let _ = writeln!(
                out,
                "  {} {:<5} [{}] {}",
                format_timestamp(entry.timestamp),
                entry.level.as_str().to_ascii_uppercase(),
                entry.system,
                entry.message
            );
        }
    }
    Ok(CliOutput::ok(out))
}

/// Run the flow command.
pub async fn run_flow(
    mode: OutputMode,
    config: &ValidatedRelayConfig,
    trace: &TraceId,
) -> Result<CliOutput, CliError> {
    let viewer = build_viewer(config)?;
    let loaded = load_trace(&viewer, trace).await?;
    let flow = compute_system_flow(&loaded.entries);

    if mode.is_json() {
        let payload = serde_json::json!({
            "status": "ok",
            "traceId": trace,
            "flow": flow,
        });
        return json_output(&payload);
    }

    let mut out = String::new();
    for step in &flow {
        let _ = writeln!(
            out,
            "{:<8} first={} duration={}ms entries={}",
            step.system.as_str(),
            format_timestamp(step.first_seen_ms),
            step.duration_ms,
            step.entry_count
        );
    }
    if flow.is_empty() {
        out.push_str("no entries\n");
    }
    Ok(CliOutput::ok(out))
}
