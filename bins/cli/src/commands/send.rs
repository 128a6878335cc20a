//! Direct submission: `send` ships one message, `pipe` ships stdin.

use crate::error::{CliError, ExitCode};
use crate::format::OutputMode;
use crate::CliOutput;
use console_relay_adapters::{StdConsole, StderrConsole, WorkerClient};
use console_relay_app::{ConsoleInterceptor, DispatchOutcome, Emission};
use console_relay_config::ValidatedRelayConfig;
use console_relay_domain::{LogLevel, SystemTag};
use console_relay_infra::global;
use console_relay_ports::ConsoleSink;
use console_relay_shared::{ErrorCode, ErrorEnvelope};
use serde::Serialize;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Send command input.
#[derive(Debug)]
pub struct SendCommandInput<'a> {
    pub message: &'a str,
    pub level: LogLevel,
    pub system: Option<SystemTag>,
}

/// Per-call fate counts.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeliveryTally {
    shipped: u64,
    suppressed: u64,
    duplicates: u64,
    rate_limited: u64,
    failed: u64,
    #[serde(skip)]
    last_error: Option<ErrorEnvelope>,
}

impl DeliveryTally {
    /// Count an emission that never reached the network.
    fn record_local(&mut self, emission: &Emission) {
        match emission {
            Emission::Suppressed => self.suppressed += 1,
            Emission::Duplicate => self.duplicates += 1,
            Emission::RateLimited { .. } => self.rate_limited += 1,
            Emission::Inert | Emission::Dispatched(_) => {},
        }
    }

    async fn settle(&mut self, emission: Emission) {
        if !emission.is_dispatched() {
            self.record_local(&emission);
            return;
        }
        match emission.settled().await {
            Some(DispatchOutcome::Accepted) => self.shipped += 1,
            Some(DispatchOutcome::RateLimited { .. }) => self.rate_limited += 1,
            Some(DispatchOutcome::Failed(error)) => {
                self.failed += 1;
                self.last_error = Some(error);
            },
            None => {
                self.failed += 1;
                self.last_error = Some(ErrorEnvelope::unexpected(
                    ErrorCode::internal(),
                    "dispatch task did not complete",
                ));
            },
        }
    }

    const fn status(&self) -> &'static str {
        if self.failed > 0 {
            "failed"
        } else if self.rate_limited > 0 {
            "rate-limited"
        } else if self.shipped > 0 {
            "shipped"
        } else if self.duplicates > 0 {
            "duplicate"
        } else if self.suppressed > 0 {
            "suppressed"
        } else {
            "idle"
        }
    }

    const fn exit_code(&self) -> ExitCode {
        if self.failed > 0 || self.rate_limited > 0 {
            ExitCode::Unavailable
        } else {
            ExitCode::Ok
        }
    }
}

fn install_relay(
    config: &ValidatedRelayConfig,
    native: Arc<dyn ConsoleSink>,
) -> Result<ConsoleInterceptor, CliError> {
    if !config.enabled {
        return Err(ErrorEnvelope::expected(
            ErrorCode::invalid_input(),
            "the relay is disabled; set CONSOLE_RELAY_ENABLED=true or `enabled = true` in the config file",
        )
        .with_metadata("setting", "enabled")
        .into());
    }

    let ingest = Arc::new(WorkerClient::from_config(config)?);
    let status = global::install_with(config, ingest, native)?;
    tracing::debug!(trace_id = %status.trace_id, "relay ready");
    global::interceptor().ok_or_else(|| {
        ErrorEnvelope::invariant(ErrorCode::internal(), "relay reported success but is not installed")
            .into()
    })
}

/// Run the send command.
pub async fn run_send(
    mode: OutputMode,
    config: &ValidatedRelayConfig,
    input: &SendCommandInput<'_>,
) -> Result<CliOutput, CliError> {
    let interceptor = install_relay(config, Arc::new(StderrConsole))?;
    let interceptor = match input.system {
        Some(system) => interceptor.with_system(system),
        None => interceptor,
    };
    let trace_id = global::trace_id();

    let mut tally = DeliveryTally::default();
    tally
        .settle(interceptor.emit(input.level, input.message, None))
        .await;
    if let Some(error) = tally.last_error.take() {
        return Err(error.into());
    }

    let stdout = if mode.is_json() {
        let payload = serde_json::json!({
            "status": tally.status(),
            "traceId": trace_id,
        });
        let mut out = serde_json::to_string_pretty(&payload)?;
        out.push('\n');
        out
    } else {
        format!("status: {}\ntraceId: {trace_id}\n", tally.status())
    };

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: tally.exit_code(),
    })
}

/// Run the pipe command. Lines are echoed to stdout as they arrive; the
/// summary goes to stderr once every dispatch has settled.
pub async fn run_pipe(
    mode: OutputMode,
    config: &ValidatedRelayConfig,
    level: LogLevel,
) -> Result<CliOutput, CliError> {
    let interceptor = install_relay(config, Arc::new(StdConsole))?;
    let trace_id = global::trace_id();

    let mut tally = DeliveryTally::default();
    let mut pending = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut read = 0_u64;
    while let Some(line) = lines.next_line().await? {
        read += 1;
        let emission = interceptor.emit(level, &line, None);
        if emission.is_dispatched() {
            pending.push(emission);
        } else {
            tally.record_local(&emission);
        }
    }
    for emission in pending {
        tally.settle(emission).await;
    }
    tracing::debug!(lines = read, shipped = tally.shipped, "stdin drained");

    let stderr = if mode.is_json() {
        let payload = serde_json::json!({
            "status": tally.status(),
            "traceId": trace_id,
            "lines": read,
            "delivery": tally,
        });
        let mut out = serde_json::to_string_pretty(&payload)?;
        out.push('\n');
        out
    } else {
        format!(
            "relay: {read} lines, {} shipped, {} suppressed, {} duplicates, {} rate limited, {} failed (trace {trace_id})\n",
            tally.shipped, tally.suppressed, tally.duplicates, tally.rate_limited, tally.failed
        )
    };

    Ok(CliOutput {
        stdout: String::new(),
        stderr,
        exit_code: tally.exit_code(),
    })
}
