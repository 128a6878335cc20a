//! Forwards `tracing` events into the relay interceptor.
//!
//! Events are observed, not re-printed: the fmt layer already wrote them, so
//! the interceptor only classifies, filters and ships.

use crate::global;
use console_relay_app::{CallSite, ConsoleInterceptor};
use console_relay_domain::{LogContext, LogLevel};
use console_relay_shared::redact_if_secret;
use serde_json::Value;
use std::cell::Cell;
use std::fmt;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

/// Targets never forwarded: the relay itself and the HTTP stack it ships with.
const IGNORED_TARGET_PREFIXES: [&str; 6] =
    ["console_relay", "hyper", "reqwest", "h2", "tokio", "rustls"];

thread_local! {
    static FORWARDING: Cell<bool> = const { Cell::new(false) };
}

enum Source {
    Global,
    Fixed(ConsoleInterceptor),
}

/// A `tracing_subscriber` layer that feeds events to an interceptor.
pub struct RelayLayer {
    source: Source,
}

impl RelayLayer {
    /// Forward to whatever interceptor the process-wide relay has installed.
    #[must_use]
    pub const fn global() -> Self {
        Self {
            source: Source::Global,
        }
    }

    /// Forward to a specific interceptor.
    #[must_use]
    pub fn with_interceptor(interceptor: ConsoleInterceptor) -> Self {
        Self {
            source: Source::Fixed(interceptor),
        }
    }

    fn interceptor(&self) -> Option<ConsoleInterceptor> {
        match &self.source {
            Source::Global => global::interceptor(),
            Source::Fixed(interceptor) => Some(interceptor.clone()),
        }
    }
}

impl fmt::Debug for RelayLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match self.source {
            Source::Global => "global",
            Source::Fixed(_) => "fixed",
        };
        f.debug_struct("RelayLayer")
            .field("source", &source)
            .finish()
    }
}

/// Whether events from `target` may be forwarded.
#[must_use]
pub fn is_forwardable_target(target: &str) -> bool {
    !IGNORED_TARGET_PREFIXES
        .iter()
        .any(|prefix| target.starts_with(prefix))
}

/// Map a tracing level onto a console level.
#[must_use]
pub fn console_level(level: &Level) -> LogLevel {
    match *level {
        Level::ERROR => LogLevel::Error,
        Level::WARN => LogLevel::Warn,
        Level::INFO => LogLevel::Info,
        _ => LogLevel::Log,
    }
}

impl<S: Subscriber> Layer<S> for RelayLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if !is_forwardable_target(metadata.target()) {
            return;
        }
        if FORWARDING.with(Cell::get) {
            return;
        }
        let Some(interceptor) = self.interceptor() else {
            return;
        };

        FORWARDING.with(|flag| flag.set(true));
        let mut fields = EventFields::default();
        event.record(&mut fields);
        let call_site = metadata.file().map(|file| CallSite {
            file,
            line: metadata.line().unwrap_or(0),
        });
        let context = (!fields.context.is_empty()).then_some(fields.context);
        let _emission = interceptor.observe(
            console_level(metadata.level()),
            &fields.message.unwrap_or_default(),
            call_site,
            context,
        );
        FORWARDING.with(|flag| flag.set(false));
    }
}

#[derive(Default)]
struct EventFields {
    message: Option<String>,
    context: LogContext,
}

impl EventFields {
    fn insert(&mut self, field: &Field, value: Value) {
        self.context.insert(field.name().to_owned(), value);
    }
}

impl Visit for EventFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_owned());
        } else {
            self.insert(field, Value::String(redact_if_secret(field.name(), value)));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::Bool(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let text = format!("{value:?}");
        if field.name() == "message" {
            self.message = Some(text);
        } else {
            self.insert(field, Value::String(redact_if_secret(field.name(), &text)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_and_transport_targets_are_ignored() {
        assert!(!is_forwardable_target("console_relay_app::interceptor"));
        assert!(!is_forwardable_target("hyper::proto::h1"));
        assert!(!is_forwardable_target("reqwest::connect"));
        assert!(is_forwardable_target("checkout::payments"));
    }

    #[test]
    fn levels_map_onto_console_levels() {
        assert_eq!(console_level(&Level::ERROR), LogLevel::Error);
        assert_eq!(console_level(&Level::WARN), LogLevel::Warn);
        assert_eq!(console_level(&Level::INFO), LogLevel::Info);
        assert_eq!(console_level(&Level::DEBUG), LogLevel::Log);
        assert_eq!(console_level(&Level::TRACE), LogLevel::Log);
    }
}
