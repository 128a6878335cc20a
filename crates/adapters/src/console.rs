//! Native console sink backed by the process stdio streams.

use console_relay_domain::LogLevel;
use console_relay_ports::ConsoleSink;
use std::io::Write;

/// Writes `log`/`info` to stdout and `warn`/`error` to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdConsole;

impl StdConsole {
    /// Whether a level is routed to stderr.
    #[must_use]
    pub const fn uses_stderr(level: LogLevel) -> bool {
        matches!(level, LogLevel::Warn | LogLevel::Error)
    }
}

impl ConsoleSink for StdConsole {
    fn write(&self, level: LogLevel, message: &str) {
        let result = if Self::uses_stderr(level) {
            writeln!(std::io::stderr().lock(), "{message}")
        } else {
            writeln!(std::io::stdout().lock(), "{message}")
        };
        // A closed pipe must not take the host down.
        let _ = result;
    }
}

/// Writes every level to stderr, for hosts whose stdout carries data.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrConsole;

impl ConsoleSink for StderrConsole {
    fn write(&self, _level: LogLevel, message: &str) {
        let _ = writeln!(std::io::stderr().lock(), "{message}");
    }
}
