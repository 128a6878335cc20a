//! Console levels and origin system tags.

use crate::primitives::PrimitiveError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which console function produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// `console.log` equivalent.
    Log,
    /// `console.info` equivalent.
    Info,
    /// `console.warn` equivalent.
    Warn,
    /// `console.error` equivalent.
    Error,
}

impl LogLevel {
    /// Every level, lowest severity first.
    pub const ALL: [Self; 4] = [Self::Log, Self::Info, Self::Warn, Self::Error];

    /// Returns the canonical string identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Parse a level name. `warning` is accepted as an alias of `warn`.
    pub fn parse(input: &str) -> Result<Self, PrimitiveError> {
        match input.trim().to_ascii_lowercase().as_str() {
            "log" => Ok(Self::Log),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(PrimitiveError::UnknownLevel {
                input: input.to_owned(),
            }),
        }
    }

    /// Warn and error records carry a call-site stack.
    #[must_use]
    pub const fn captures_stack(self) -> bool {
        matches!(self, Self::Warn | Self::Error)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Subsystem that produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemTag {
    /// Default origin for intercepted console output.
    Browser,
    /// Backend output observed through the intercepted console.
    Backend,
    /// Submitted directly through the ingestion API by a person.
    Manual,
    /// Submitted directly by the ingestion worker itself.
    Worker,
}

impl SystemTag {
    /// Every system tag.
    pub const ALL: [Self; 4] = [Self::Browser, Self::Backend, Self::Manual, Self::Worker];

    /// Returns the canonical string identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Browser => "browser",
            Self::Backend => "backend",
            Self::Manual => "manual",
            Self::Worker => "worker",
        }
    }

    /// Parse a system name.
    pub fn parse(input: &str) -> Result<Self, PrimitiveError> {
        match input.trim().to_ascii_lowercase().as_str() {
            "browser" => Ok(Self::Browser),
            "backend" => Ok(Self::Backend),
            "manual" => Ok(Self::Manual),
            "worker" => Ok(Self::Worker),
            _ => Err(PrimitiveError::UnknownSystem {
                input: input.to_owned(),
            }),
        }
    }
}

impl fmt::Display for SystemTag {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_warn_and_error_capture_stacks() {
        let capturing: Vec<_> = LogLevel::ALL
            .into_iter()
            .filter(|level| level.captures_stack())
            .collect();
        assert_eq!(capturing, vec![LogLevel::Warn, LogLevel::Error]);
    }

    #[test]
    fn level_parse_is_case_insensitive() -> Result<(), PrimitiveError> {
        assert_eq!(LogLevel::parse("WARNING")?, LogLevel::Warn);
        assert_eq!(LogLevel::parse(" Info ")?, LogLevel::Info);
        assert!(LogLevel::parse("trace").is_err());
        Ok(())
    }

    #[test]
    fn system_tags_serialize_lowercase() -> Result<(), serde_json::Error> {
        assert_eq!(serde_json::to_string(&SystemTag::Backend)?, "\"backend\"");
        let parsed: SystemTag = serde_json::from_str("\"worker\"")?;
        assert_eq!(parsed, SystemTag::Worker);
        Ok(())
    }
}
