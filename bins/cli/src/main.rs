//! `relay` binary entrypoint.

mod commands;
mod error;
mod format;

use clap::{Parser, Subcommand};
use commands::{
    LogsCommandInput, SendCommandInput, run_chains, run_clear, run_flow, run_logs, run_patterns,
    run_pipe, run_redact, run_send, run_status, run_traces,
};
use console_relay_app::ExportFormat;
use console_relay_domain::{LogLevel, SystemTag, TraceId};
use console_relay_infra::{InfraError, LogFormat, TracingOptions, init_tracing, load_config};
use console_relay_shared::{ErrorCode, ErrorEnvelope, ErrorKind, is_secret_key};
use error::{CliError, ExitCode};
use format::{OutputArgs, OutputMode};
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "relay",
    version,
    about = "Ship console output to a log worker and inspect what it stored",
    long_about = None
)]
struct Cli {
    /// Optional config file path (JSON/TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    output: OutputArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show the effective relay configuration.
    Status,
    /// List recent traces stored by the worker.
    Traces {
        /// Maximum number of traces.
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Show, filter, and export the entries of one trace.
    Logs {
        /// Trace identifier (`trace_<ms>_<hex>`).
        #[arg(value_parser = parse_trace_id)]
        trace: TraceId,
        /// Keep only these systems (repeatable).
        #[arg(long = "system", value_parser = parse_system)]
        systems: Vec<SystemTag>,
        /// Keep only these levels (repeatable).
        #[arg(long = "level", value_parser = parse_level)]
        levels: Vec<LogLevel>,
        /// Case-insensitive text search.
        #[arg(long)]
        search: Option<String>,
        /// Newest first.
        #[arg(long)]
        reverse: bool,
        /// Render as an export document (json, text, or ai).
        #[arg(long, value_parser = parse_export_format)]
        format: Option<ExportFormat>,
        /// Copy the export to the clipboard.
        #[arg(long)]
        copy: bool,
        /// Save the export under the configured export directory.
        #[arg(long)]
        save: bool,
    },
    /// Group the warnings and errors of a trace into chains.
    Chains {
        /// Trace identifier.
        #[arg(value_parser = parse_trace_id)]
        trace: TraceId,
        /// Maximum gap between chain members.
        #[arg(long)]
        proximity_ms: Option<u64>,
    },
    /// Show which systems a trace passed through.
    Flow {
        /// Trace identifier.
        #[arg(value_parser = parse_trace_id)]
        trace: TraceId,
    },
    /// Delete every stored log (owner only).
    Clear {
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },
    /// Show how a sample would be redacted before shipping.
    Redact {
        /// Text to redact.
        sample: String,
        /// Extra redaction regex with one capture group (repeatable).
        #[arg(long = "pattern")]
        patterns: Vec<String>,
    },
    /// List the active suppression and redaction rules.
    Patterns,
    /// Ship a single message through the relay.
    Send {
        /// Message text.
        message: String,
        /// Console level.
        #[arg(long, default_value = "log", value_parser = parse_level)]
        level: LogLevel,
        /// Tag the record with this system instead of classifying it.
        #[arg(long, value_parser = parse_system)]
        system: Option<SystemTag>,
    },
    /// Ship stdin line by line, echoing it to stdout.
    Pipe {
        /// Console level for every line.
        #[arg(long, default_value = "log", value_parser = parse_level)]
        level: LogLevel,
    },
}

fn parse_trace_id(input: &str) -> Result<TraceId, String> {
    TraceId::parse(input).map_err(|error| error.to_string())
}

fn parse_level(input: &str) -> Result<LogLevel, String> {
    LogLevel::parse(input).map_err(|error| error.to_string())
}

fn parse_system(input: &str) -> Result<SystemTag, String> {
    SystemTag::parse(input).map_err(|error| error.to_string())
}

fn parse_export_format(input: &str) -> Result<ExportFormat, String> {
    ExportFormat::parse(input).map_err(|error| error.message)
}

pub(crate) struct CliOutput {
    stdout: String,
    stderr: String,
    exit_code: ExitCode,
}

impl CliOutput {
    pub(crate) const fn ok(stdout: String) -> Self {
        Self {
            stdout,
            stderr: String::new(),
            exit_code: ExitCode::Ok,
        }
    }
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let mode = OutputMode::from_args(&cli.output);

    let tracing = TracingOptions {
        format: if mode.is_json() {
            LogFormat::Json
        } else {
            LogFormat::Text
        },
        default_directive: cli.output.log_directive(),
        forward_to_relay: false,
    };
    if let Err(error) = init_tracing(tracing) {
        let _ = writeln!(io::stderr(), "warning: {error}");
    }

    let output = match run(&cli, mode) {
        Ok(output) => output,
        Err(CliError::Relay(error)) => format_error_output(mode, &error, relay_exit_code(&error)),
        Err(error) => return exit_with_error(&error),
    };
    match write_output(&output) {
        Ok(()) => std::process::ExitCode::from(output.exit_code.as_u8()),
        Err(error) => exit_with_error(&error),
    }
}

fn exit_with_error(error: &CliError) -> std::process::ExitCode {
    let _ = writeln!(io::stderr(), "error: {error}");
    std::process::ExitCode::from(error.exit_code().as_u8())
}

fn run(cli: &Cli, mode: OutputMode) -> Result<CliOutput, CliError> {
    let config_path = cli.config.as_deref();
    match &cli.command {
        Commands::Status => run_status(mode, &load_config(config_path)?),
        Commands::Redact { sample, patterns } => run_redact(mode, sample, patterns),
        Commands::Patterns => run_patterns(mode),
        Commands::Traces { limit } => {
            let config = load_config(config_path)?;
            block_on(run_traces(mode, &config, *limit))
        },
        Commands::Logs {
            trace,
            systems,
            levels,
            search,
            reverse,
            format,
            copy,
            save,
        } => {
            let config = load_config(config_path)?;
            let input = LogsCommandInput {
                trace,
                systems,
                levels,
                search: search.as_deref(),
                reverse: *reverse,
                format: *format,
                copy: *copy,
                save: *save,
            };
            block_on(run_logs(mode, &config, &input))
        },
        Commands::Chains {
            trace,
            proximity_ms,
        } => {
            let config = load_config(config_path)?;
            block_on(run_chains(mode, &config, trace, *proximity_ms))
        },
        Commands::Flow { trace } => {
            let config = load_config(config_path)?;
            block_on(run_flow(mode, &config, trace))
        },
        Commands::Clear { yes } => {
            let config = load_config(config_path)?;
            block_on(run_clear(mode, &config, *yes))
        },
        Commands::Send {
            message,
            level,
            system,
        } => {
            let config = load_config(config_path)?;
            let input = SendCommandInput {
                message,
                level: *level,
                system: *system,
            };
            block_on(run_send(mode, &config, &input))
        },
        Commands::Pipe { level } => {
            let config = load_config(config_path)?;
            block_on(run_pipe(mode, &config, *level))
        },
    }
}

fn block_on<F>(future: F) -> Result<CliOutput, CliError>
where
    F: Future<Output = Result<CliOutput, CliError>>,
{
    tokio::runtime::Runtime::new()?.block_on(future)
}

/// Serialize `payload` as pretty JSON with a trailing newline.
pub(crate) fn json_output(payload: &serde_json::Value) -> Result<CliOutput, CliError> {
    let mut out = serde_json::to_string_pretty(payload)?;
    out.push('\n');
    Ok(CliOutput::ok(out))
}

pub(crate) fn format_error_output(
    mode: OutputMode,
    error: &InfraError,
    exit_code: ExitCode,
) -> CliOutput {
    let error = sanitize_error(error.clone());

    let stdout = if mode.is_json() {
        let payload = serde_json::json!({
            "status": "error",
            "error": error,
        });

        // This is a CLI boundary, so JSON serialization errors are internal.
        let mut output = serde_json::to_string_pretty(&payload).unwrap_or_else(|_| {
            "{\"status\":\"error\",\"error\":{\"kind\":\"unexpected\",\"code\":\"core:internal\",\"message\":\"internal error\"}}".to_owned()
        });
        output.push('\n');
        output
    } else {
        format_error_text(&error)
    };

    CliOutput {
        stdout,
        stderr: String::new(),
        exit_code,
    }
}

pub(crate) fn relay_exit_code(error: &ErrorEnvelope) -> ExitCode {
    let code = &error.code;
    if *code == ErrorCode::transport()
        || *code == ErrorCode::timeout()
        || *code == ErrorCode::http_status()
    {
        return ExitCode::Unavailable;
    }
    if *code == ErrorCode::io() {
        return ExitCode::Io;
    }
    match error.kind {
        ErrorKind::Expected => ExitCode::InvalidInput,
        ErrorKind::Invariant | ErrorKind::Unexpected => ExitCode::Internal,
    }
}

fn sanitize_error(mut error: ErrorEnvelope) -> ErrorEnvelope {
    for (key, value) in &mut error.metadata {
        if is_secret_key(key) {
            *value = "<redacted>".to_owned();
        }
    }
    error
}

fn format_error_text(error: &ErrorEnvelope) -> String {
    let mut out = String::new();
    out.push_str("status: error\n");
    out.push_str("code: ");
    out.push_str(&error.code.to_string());
    out.push('\n');
    out.push_str("message: ");
    out.push_str(&error.message);
    out.push('\n');
    out.push_str("kind: ");
    out.push_str(&error.kind.to_string());
    out.push('\n');

    if !error.metadata.is_empty() {
        out.push_str("meta:\n");
        for (key, value) in &error.metadata {
            out.push_str("  ");
            out.push_str(key);
            out.push_str(": ");
            out.push_str(value);
            out.push('\n');
        }
    }
    out
}

fn write_output(output: &CliOutput) -> Result<(), CliError> {
    let mut stdout = io::stdout();
    stdout.write_all(output.stdout.as_bytes())?;
    stdout.flush()?;

    if !output.stderr.is_empty() {
        let mut stderr = io::stderr();
        stderr.write_all(output.stderr.as_bytes())?;
        stderr.flush()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::OutputFormat;
    use clap::CommandFactory;

    fn json_mode() -> OutputMode {
        OutputMode {
            format: OutputFormat::Json,
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn version_flag_is_supported() {
        let result = Cli::command().try_get_matches_from(["relay", "--version"]);
        let is_version = matches!(
            result,
            Err(error) if error.kind() == clap::error::ErrorKind::DisplayVersion
        );

        assert!(is_version, "expected clap to render version");
    }

    #[test]
    fn logs_flags_parse_into_domain_types() -> Result<(), Box<dyn std::error::Error>> {
        let cli = Cli::try_parse_from([
            "relay",
            "logs",
            "trace_1700000000000_0badf00d",
            "--system",
            "backend",
            "--level",
            "error",
            "--level",
            "warn",
            "--format",
            "ai",
        ])?;
        let Commands::Logs {
            systems,
            levels,
            format,
            ..
        } = cli.command
        else {
            return Err("expected logs command".into());
        };
        assert_eq!(systems, vec![SystemTag::Backend]);
        assert_eq!(levels, vec![LogLevel::Error, LogLevel::Warn]);
        assert_eq!(format, Some(ExportFormat::Ai));
        Ok(())
    }

    #[test]
    fn malformed_trace_ids_are_rejected_by_the_parser() {
        let result = Cli::try_parse_from(["relay", "flow", "trace with spaces"]);
        assert!(result.is_err());
    }

    #[test]
    fn exit_codes_for_errors() -> Result<(), Box<dyn std::error::Error>> {
        let io_error = CliError::Io(io::Error::other("io"));
        let serialization_error = match serde_json::from_str::<serde_json::Value>("not-json") {
            Ok(_) => return Err("expected serialization error".into()),
            Err(error) => CliError::Serialization(error),
        };
        let unreachable =
            CliError::Relay(ErrorEnvelope::unexpected(ErrorCode::transport(), "refused"));
        let denied = CliError::Relay(ErrorEnvelope::expected(
            ErrorCode::permission_denied(),
            "owner only",
        ));

        assert_eq!(io_error.exit_code(), ExitCode::Io);
        assert_eq!(serialization_error.exit_code(), ExitCode::Internal);
        assert_eq!(unreachable.exit_code(), ExitCode::Unavailable);
        assert_eq!(denied.exit_code(), ExitCode::InvalidInput);
        Ok(())
    }

    #[test]
    fn error_formatting_redacts_sensitive_meta_keys() -> Result<(), Box<dyn std::error::Error>> {
        let error = ErrorEnvelope::expected(ErrorCode::invalid_input(), "bad env")
            .with_metadata("apiKey", "secret-value")
            .with_metadata("field", "workerUrl");

        let output = format_error_output(json_mode(), &error, ExitCode::InvalidInput);
        let value: serde_json::Value = serde_json::from_str(output.stdout.trim())?;

        assert_eq!(
            value.pointer("/error/metadata/apiKey"),
            Some(&serde_json::json!("<redacted>"))
        );
        assert_eq!(
            value.pointer("/error/metadata/field"),
            Some(&serde_json::json!("workerUrl"))
        );
        assert_eq!(output.exit_code, ExitCode::InvalidInput);
        Ok(())
    }

    #[test]
    fn text_errors_list_code_and_metadata() {
        let error = ErrorEnvelope::expected(ErrorCode::permission_denied(), "owner only")
            .with_metadata("operation", "clear_logs");
        let mode = OutputMode {
            format: OutputFormat::Text,
        };

        let output = format_error_output(mode, &error, ExitCode::InvalidInput);
        assert!(output.stdout.starts_with("status: error\n"));
        assert!(output.stdout.contains("message: owner only\n"));
        assert!(output.stdout.contains("kind: expected\n"));
        assert!(output.stdout.contains("  operation: clear_logs\n"));
    }
}
