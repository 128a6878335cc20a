//! Console output and time sources.

use console_relay_domain::LogLevel;

/// A console output sink.
///
/// The sink captured before the relay installs is the "native" console; every
/// diagnostic the relay emits about itself goes there and never back through
/// the interceptor.
pub trait ConsoleSink: Send + Sync {
    /// Write one already-serialized message at the given level.
    fn write(&self, level: LogLevel, message: &str);
}

/// Wall-clock source in epoch milliseconds.
pub trait Clock: Send + Sync {
    /// Current time in epoch milliseconds.
    fn now_ms(&self) -> u64;
}
