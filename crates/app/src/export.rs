//! Export rendering and delivery.

use crate::correlation::{sort_chronological, truncate_chars};
use console_relay_domain::{LogLevel, StoredLogEntry, TraceId};
use console_relay_ports::{ClipboardPort, ExportFilePort};
use console_relay_shared::{ErrorCode, ErrorEnvelope, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

const TEXT_STACK_LINES: usize = 5;
const TEXT_CONTEXT_CHARS: usize = 200;
const AI_MESSAGE_CHARS: usize = 500;

/// Output layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Lossless JSON document.
    Json,
    /// Human-readable blocks.
    Text,
    /// Dense, trace-grouped layout for analysis tools.
    Ai,
}

impl ExportFormat {
    /// Lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "text",
            Self::Ai => "ai",
        }
    }

    /// File extension for the format.
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "txt",
            Self::Ai => "md",
        }
    }

    /// Parse `json`, `text`, or `ai`.
    pub fn parse(input: &str) -> Result<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" | "txt" => Ok(Self::Text),
            "ai" => Ok(Self::Ai),
            _ => Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                format!("unknown export format `{input}` (expected json|text|ai)"),
            )),
        }
    }
}

/// Where the rendered export goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportDestination {
    /// System clipboard.
    Clipboard,
    /// A file in the export directory.
    File,
}

impl ExportDestination {
    /// Lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Clipboard => "clipboard",
            Self::File => "file",
        }
    }
}

/// Delivery collaborators.
#[derive(Clone)]
pub struct ExportDeps {
    /// Clipboard writer.
    pub clipboard: Arc<dyn ClipboardPort>,
    /// File writer.
    pub files: Arc<dyn ExportFilePort>,
}

/// The lossless JSON export document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredExport {
    /// Trace shared by every entry, if there is exactly one.
    pub trace_id: Option<TraceId>,
    /// Export time, RFC 3339.
    pub exported_at: String,
    /// Number of entries.
    pub count: usize,
    /// Entries as given.
    pub logs: Vec<StoredLogEntry>,
}

/// What an export produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    /// Layout used.
    pub format: ExportFormat,
    /// Requested destination.
    pub destination: ExportDestination,
    /// Suggested file name.
    pub file_name: String,
    /// Entries exported.
    pub count: usize,
    /// Rendered size in bytes.
    pub bytes: usize,
    /// False when the destination refused the content.
    pub delivered: bool,
    /// Where a file export landed.
    pub location: Option<PathBuf>,
}

/// Render `entries` and hand them to `destination`.
///
/// Delivery failures are logged and reported through `delivered`, never as
/// errors.
pub fn export(
    deps: &ExportDeps,
    entries: &[StoredLogEntry],
    format: ExportFormat,
    destination: ExportDestination,
    now_ms: u64,
) -> Result<ExportReport> {
    let body = render_export(entries, format, now_ms)?;
    let file_name = export_file_name(entries, format, now_ms);

    let delivery = match destination {
        ExportDestination::Clipboard => deps.clipboard.write_text(&body).map(|()| None),
        ExportDestination::File => deps.files.write_file(&file_name, &body).map(Some),
    };
    let (delivered, location) = match delivery {
        Ok(location) => (true, location),
        Err(error) => {
            tracing::debug!(
                error = %error,
                destination = ?destination,
                "export delivery failed"
            );
            (false, None)
        },
    };

    Ok(ExportReport {
        format,
        destination,
        file_name,
        count: entries.len(),
        bytes: body.len(),
        delivered,
        location,
    })
}

/// Render entries in the given layout.
pub fn render_export(
    entries: &[StoredLogEntry],
    format: ExportFormat,
    now_ms: u64,
) -> Result<String> {
    match format {
        ExportFormat::Json => render_json(entries, now_ms),
        ExportFormat::Text => Ok(render_text(entries, now_ms)),
        ExportFormat::Ai => Ok(render_ai(entries)),
    }
}

/// Read back a JSON export.
pub fn parse_structured_export(input: &str) -> Result<StructuredExport> {
    serde_json::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::invalid_input(),
            format!("invalid structured export: {error}"),
        )
    })
}

/// `debug-logs-{trace|all}-{ms}.{ext}`.
pub fn export_file_name(entries: &[StoredLogEntry], format: ExportFormat, now_ms: u64) -> String {
    let scope = single_trace(entries).map_or_else(|| "all".to_owned(), |trace| trace.to_string());
    format!("debug-logs-{scope}-{now_ms}.{}", format.extension())
}

/// `YYYY-MM-DD HH:MM:SS.mmm` in UTC.
pub fn format_timestamp(epoch_ms: u64) -> String {
    i64::try_from(epoch_ms)
        .ok()
        .and_then(chrono::DateTime::from_timestamp_millis)
        .map_or_else(
            || epoch_ms.to_string(),
            |time| time.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
        )
}

fn rfc3339(epoch_ms: u64) -> String {
    i64::try_from(epoch_ms)
        .ok()
        .and_then(chrono::DateTime::from_timestamp_millis)
        .map_or_else(
            || epoch_ms.to_string(),
            |time| time.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        )
}

fn single_trace(entries: &[StoredLogEntry]) -> Option<&TraceId> {
    let first = &entries.first()?.trace_id;
    entries
        .iter()
        .all(|entry| &entry.trace_id == first)
        .then_some(first)
}

fn render_json(entries: &[StoredLogEntry], now_ms: u64) -> Result<String> {
    let document = StructuredExport {
        trace_id: single_trace(entries).cloned(),
        exported_at: rfc3339(now_ms),
        count: entries.len(),
        logs: entries.to_vec(),
    };
    serde_json::to_string_pretty(&document).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::internal(),
            format!("failed to serialize export: {error}"),
        )
    })
}

fn render_text(entries: &[StoredLogEntry], now_ms: u64) -> String {
    let mut output = format!(
        "Debug logs export ({} entries, exported {})\n",
        entries.len(),
        format_timestamp(now_ms)
    );

    for entry in entries {
        let _ = write!(
            output,
            "\n[{}] {} ({}) {}\n  trace: {}  user: {}\n",
            format_timestamp(entry.timestamp),
            entry.level.as_str().to_ascii_uppercase(),
            entry.system,
            entry.message,
            entry.trace_id,
            entry.user_id,
        );
        if let Some(stack) = entry.stack.as_deref() {
            output.push_str("  stack:\n");
            let lines: Vec<&str> = stack.lines().collect();
            for line in lines.iter().take(TEXT_STACK_LINES) {
                let _ = writeln!(output, "    {}", line.trim_end());
            }
            if lines.len() > TEXT_STACK_LINES {
                let _ = writeln!(
                    output,
                    "    ... {} more lines",
                    lines.len() - TEXT_STACK_LINES
                );
            }
        }
        if let Some(context) = entry.context.as_ref() {
            let _ = writeln!(
                output,
                "  context: {}",
                truncate_chars(&context.to_string(), TEXT_CONTEXT_CHARS)
            );
        }
    }

    output
}

fn render_ai(entries: &[StoredLogEntry]) -> String {
    let mut ordered = entries.to_vec();
    sort_chronological(&mut ordered);

    let mut traces: Vec<(TraceId, Vec<StoredLogEntry>)> = Vec::new();
    for entry in ordered {
        match traces.iter_mut().find(|(trace, _)| *trace == entry.trace_id) {
            Some((_, members)) => members.push(entry),
            None => traces.push((entry.trace_id.clone(), vec![entry])),
        }
    }

    let count_level = |level: LogLevel| {
        entries
            .iter()
            .filter(|entry| entry.level == level)
            .count()
    };
    let mut systems: Vec<&str> = entries.iter().map(|entry| entry.system.as_str()).collect();
    systems.sort_unstable();
    systems.dedup();

    let mut output = String::from("# Debug log export\n");
    let _ = writeln!(
        output,
        "Summary: {} entries, {} traces, {} errors, {} warnings, systems: {}",
        entries.len(),
        traces.len(),
        count_level(LogLevel::Error),
        count_level(LogLevel::Warn),
        if systems.is_empty() {
            "none".to_owned()
        } else {
            systems.join(", ")
        }
    );

    for (trace, members) in &traces {
        let start = members.first().map_or(0, |entry| entry.timestamp);
        let end = members.last().map_or(start, |entry| entry.timestamp);
        let _ = write!(
            output,
            "\n## {trace} ({} entries, {} ms, started {})\n",
            members.len(),
            end.saturating_sub(start),
            format_timestamp(start)
        );
        for entry in members {
            let _ = writeln!(
                output,
                "+{}ms {} {}: {}",
                entry.timestamp.saturating_sub(start),
                entry.level.as_str().to_ascii_uppercase(),
                entry.system,
                truncate_chars(&entry.message, AI_MESSAGE_CHARS)
            );
            if let Some(first_frame) = entry.stack.as_deref().and_then(|stack| stack.lines().next())
            {
                let _ = writeln!(output, "  stack: {}", first_frame.trim());
            }
            if let Some(context) = entry.context.as_ref() {
                let _ = writeln!(output, "  context: {context}");
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use console_relay_domain::{LogRecord, SystemTag, UserId};
    use serde_json::json;

    fn entry(id: &str, trace: u32, timestamp: u64, level: LogLevel) -> StoredLogEntry {
        StoredLogEntry::from_record(
            id,
            LogRecord {
                trace_id: TraceId::generated(1_700_000_000_000, trace),
                user_id: UserId::anonymous(),
                timestamp,
                level,
                message: format!("message {id}"),
                system: SystemTag::Browser,
                stack: None,
                context: None,
            },
        )
    }

    #[test]
    fn timestamps_render_in_utc() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00:00.000");
        assert_eq!(format_timestamp(1_500), "1970-01-01 00:00:01.500");
    }

    #[test]
    fn file_names_use_trace_when_unique() {
        let one = vec![entry("a", 1, 10, LogLevel::Log)];
        assert_eq!(
            export_file_name(&one, ExportFormat::Json, 99),
            "debug-logs-trace_1700000000000_00000001-99.json"
        );
        let mixed = vec![entry("a", 1, 10, LogLevel::Log), entry("b", 2, 11, LogLevel::Log)];
        assert_eq!(
            export_file_name(&mixed, ExportFormat::Ai, 99),
            "debug-logs-all-99.md"
        );
    }

    #[test]
    fn text_limits_stack_and_context() -> Result<()> {
        let mut noisy = entry("a", 1, 0, LogLevel::Error);
        noisy.stack = Some((1..=8).map(|n| format!("frame {n}")).collect::<Vec<_>>().join("\n"));
        noisy.context = Some(json!({"blob": "x".repeat(400)}));

        let text = render_export(&[noisy], ExportFormat::Text, 0)?;
        assert!(text.contains("ERROR (browser) message a"));
        assert!(text.contains("frame 5"));
        assert!(!text.contains("frame 6"));
        assert!(text.contains("... 3 more lines"));
        let context_line = text
            .lines()
            .find(|line| line.trim_start().starts_with("context:"))
            .unwrap_or_default();
        assert!(context_line.ends_with("..."));
        assert!(context_line.len() < 230);
        Ok(())
    }

    #[test]
    fn ai_groups_by_trace_with_relative_times() -> Result<()> {
        let entries = vec![
            entry("b", 1, 1_250, LogLevel::Error),
            entry("a", 1, 1_000, LogLevel::Log),
            entry("c", 2, 5_000, LogLevel::Warn),
        ];
        let text = render_export(&entries, ExportFormat::Ai, 0)?;
        assert!(text.contains("Summary: 3 entries, 2 traces, 1 errors, 1 warnings, systems: browser"));
        assert!(text.contains("## trace_1700000000000_00000001 (2 entries, 250 ms"));
        assert!(text.contains("+0ms LOG browser: message a"));
        assert!(text.contains("+250ms ERROR browser: message b"));
        Ok(())
    }

    #[test]
    fn unknown_format_is_invalid_input() {
        let error = ExportFormat::parse("xml").err();
        assert_eq!(error.map(|error| error.code), Some(ErrorCode::invalid_input()));
    }

    struct RefusingDestination;

    impl ClipboardPort for RefusingDestination {
        fn write_text(&self, _text: &str) -> Result<()> {
            Err(ErrorEnvelope::unexpected(ErrorCode::io(), "clipboard unavailable"))
        }
    }

    impl ExportFilePort for RefusingDestination {
        fn write_file(&self, _file_name: &str, _contents: &str) -> Result<PathBuf> {
            Err(ErrorEnvelope::unexpected(ErrorCode::io(), "disk full"))
        }
    }

    #[test]
    fn refused_delivery_is_reported_not_raised() -> Result<()> {
        let deps = ExportDeps {
            clipboard: Arc::new(RefusingDestination),
            files: Arc::new(RefusingDestination),
        };
        let entries = vec![entry("a", 1, 1_000, LogLevel::Error)];

        for destination in [ExportDestination::Clipboard, ExportDestination::File] {
            let report = export(&deps, &entries, ExportFormat::Text, destination, 2_000)?;
            assert!(!report.delivered);
            assert_eq!(report.location, None);
            assert_eq!(report.count, 1);
            assert!(report.bytes > 0);
        }
        Ok(())
    }
}
