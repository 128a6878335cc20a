//! Domain primitives with validated constructors.

use console_relay_shared::{ErrorCode, ErrorEnvelope};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel user id used until an authenticated identity is known.
pub const ANONYMOUS_USER: &str = "anonymous";

/// Prefix shared by every generated trace id.
pub const TRACE_ID_PREFIX: &str = "trace_";

/// Validation failures for domain primitives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimitiveError {
    /// `TraceId` is empty after trimming.
    EmptyTraceId {
        /// Length of the raw input before trimming.
        input_length: usize,
    },
    /// `TraceId` contains whitespace or control characters.
    InvalidTraceId {
        /// Trimmed trace id that failed validation.
        input: String,
    },
    /// `UserId` is empty after trimming.
    EmptyUserId {
        /// Length of the raw input before trimming.
        input_length: usize,
    },
    /// A level name is not one of log/info/warn/error.
    UnknownLevel {
        /// Raw level name.
        input: String,
    },
    /// A system name is not one of browser/backend/manual/worker.
    UnknownSystem {
        /// Raw system name.
        input: String,
    },
}

impl PrimitiveError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::EmptyTraceId { .. } | Self::InvalidTraceId { .. } => {
                ErrorCode::new("domain", "invalid_trace_id")
            },
            Self::EmptyUserId { .. } => ErrorCode::new("domain", "invalid_user_id"),
            Self::UnknownLevel { .. } => ErrorCode::new("domain", "unknown_level"),
            Self::UnknownSystem { .. } => ErrorCode::new("domain", "unknown_system"),
        }
    }
}

impl fmt::Display for PrimitiveError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyTraceId { .. } => formatter.write_str("TraceId must be non-empty"),
            Self::InvalidTraceId { .. } => {
                formatter.write_str("TraceId must not contain whitespace or control characters")
            },
            Self::EmptyUserId { .. } => formatter.write_str("UserId must be non-empty"),
            Self::UnknownLevel { input } => {
                write!(formatter, "unknown log level `{input}` (expected log|info|warn|error)")
            },
            Self::UnknownSystem { input } => write!(
                formatter,
                "unknown system `{input}` (expected browser|backend|manual|worker)"
            ),
        }
    }
}

impl std::error::Error for PrimitiveError {}

impl From<PrimitiveError> for ErrorEnvelope {
    fn from(error: PrimitiveError) -> Self {
        let envelope = Self::expected(error.error_code(), error.to_string());
        match error {
            PrimitiveError::EmptyTraceId { input_length }
            | PrimitiveError::EmptyUserId { input_length } => {
                envelope.with_metadata("input_length", input_length.to_string())
            },
            PrimitiveError::InvalidTraceId { input }
            | PrimitiveError::UnknownLevel { input }
            | PrimitiveError::UnknownSystem { input } => envelope.with_metadata("input", input),
        }
    }
}

/// Correlation identifier shared by every record of one logical session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TraceId(Box<str>);

impl TraceId {
    /// Parse a `TraceId` from user input or stored data.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, PrimitiveError> {
        let raw = input.as_ref();
        let Some(trimmed) = trimmed_non_empty(raw) else {
            return Err(PrimitiveError::EmptyTraceId {
                input_length: raw.len(),
            });
        };

        if trimmed
            .chars()
            .any(|ch| ch.is_whitespace() || ch.is_control())
        {
            return Err(PrimitiveError::InvalidTraceId {
                input: trimmed.to_owned(),
            });
        }

        Ok(Self(trimmed.to_owned().into_boxed_str()))
    }

    /// Compose a trace id from a millisecond timestamp and a random suffix.
    ///
    /// The result has the shape `trace_{epoch_ms}_{suffix}`.
    pub fn compose(epoch_ms: u64, suffix: &str) -> Result<Self, PrimitiveError> {
        Self::parse(format!("{TRACE_ID_PREFIX}{epoch_ms}_{suffix}"))
    }

    /// Build a generated trace id: `trace_{epoch_ms}_{8 lowercase hex}`.
    #[must_use]
    pub fn generated(epoch_ms: u64, random: u32) -> Self {
        Self(format!("{TRACE_ID_PREFIX}{epoch_ms}_{random:08x}").into_boxed_str())
    }

    /// Access the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the underlying string.
    #[must_use]
    pub fn into_inner(self) -> Box<str> {
        self.0
    }
}

impl AsRef<str> for TraceId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<String> for TraceId {
    type Error = PrimitiveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<TraceId> for String {
    fn from(value: TraceId) -> Self {
        value.into_inner().into_string()
    }
}

/// Identifier for the person behind a session; `anonymous` until known.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(Box<str>);

impl UserId {
    /// Parse a `UserId` from user input.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, PrimitiveError> {
        let raw = input.as_ref();
        let Some(trimmed) = trimmed_non_empty(raw) else {
            return Err(PrimitiveError::EmptyUserId {
                input_length: raw.len(),
            });
        };

        Ok(Self(trimmed.to_owned().into_boxed_str()))
    }

    /// The anonymous sentinel.
    #[must_use]
    pub fn anonymous() -> Self {
        Self(ANONYMOUS_USER.into())
    }

    /// Returns true when this is the anonymous sentinel.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        &*self.0 == ANONYMOUS_USER
    }

    /// Access the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::anonymous()
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<String> for UserId {
    type Error = PrimitiveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0.into_string()
    }
}

fn trimmed_non_empty(input: &str) -> Option<&str> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
