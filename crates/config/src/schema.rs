//! Relay configuration schema and validation.

use console_relay_shared::{ErrorCode, ErrorEnvelope};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Supported config schema version.
pub const CURRENT_CONFIG_VERSION: u32 = 1;

/// Ingestion worker used when no valid URL is configured.
pub const DEFAULT_WORKER_URL: &str = "http://localhost:8787";

const DUPLICATE_WINDOW_DEFAULT_MS: u64 = 5_000;
const DUPLICATE_WINDOW_MIN_MS: u64 = 100;
const DUPLICATE_WINDOW_MAX_MS: u64 = 600_000;
const DUPLICATE_THRESHOLD_DEFAULT: u32 = 5;
const DUPLICATE_THRESHOLD_MIN: u32 = 1;
const DUPLICATE_THRESHOLD_MAX: u32 = 10_000;
const DUPLICATE_MAX_SIGNATURES_DEFAULT: u32 = 512;
const DUPLICATE_MAX_SIGNATURES_MIN: u32 = 1;
const DUPLICATE_MAX_SIGNATURES_MAX: u32 = 100_000;

const QUOTA_LIMIT_DEFAULT: u32 = 1_000;
const QUOTA_LIMIT_MIN: u32 = 1;
const QUOTA_LIMIT_MAX: u32 = 1_000_000;
const QUOTA_WINDOW_DEFAULT_MS: u64 = 60_000;
const QUOTA_WINDOW_MIN_MS: u64 = 1_000;
const QUOTA_WINDOW_MAX_MS: u64 = 86_400_000;

const CHAIN_PROXIMITY_DEFAULT_MS: u64 = 5_000;
const CHAIN_PROXIMITY_MIN_MS: u64 = 1;
const CHAIN_PROXIMITY_MAX_MS: u64 = 3_600_000;
const CHAIN_MIN_ENTRIES_DEFAULT: u32 = 2;
const CHAIN_MIN_ENTRIES_MIN: u32 = 1;
const CHAIN_MIN_ENTRIES_MAX: u32 = 1_000;

/// Top-level relay configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct RelayConfig {
    /// Schema version for forward-compatible migrations.
    pub version: u32,
    /// Whether the interceptor installs at all.
    pub enabled: bool,
    /// Base URL of the ingestion worker.
    pub worker_url: Box<str>,
    /// Owner capability; required to clear stored logs.
    pub owner: bool,
    /// Duplicate-suppression settings.
    pub duplicates: DuplicatesConfig,
    /// Local send quota settings.
    pub quota: QuotaConfig,
    /// Error-chain heuristics.
    pub correlation: CorrelationConfig,
    /// Export delivery settings.
    pub export: ExportConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            version: CURRENT_CONFIG_VERSION,
            enabled: false,
            worker_url: DEFAULT_WORKER_URL.into(),
            owner: false,
            duplicates: DuplicatesConfig::default(),
            quota: QuotaConfig::default(),
            correlation: CorrelationConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Validate and normalize the config.
    ///
    /// An unusable worker URL is not an error: the default URL is substituted
    /// and the rejected value is kept on the validated config for reporting.
    pub fn validate_and_normalize(mut self) -> Result<ValidatedRelayConfig, ConfigSchemaError> {
        if self.version != CURRENT_CONFIG_VERSION {
            return Err(ConfigSchemaError::UnsupportedVersion {
                found: self.version,
                supported: CURRENT_CONFIG_VERSION,
            });
        }

        let worker_url_fallback = match normalize_worker_url(&self.worker_url) {
            Some(normalized) => {
                self.worker_url = normalized;
                None
            },
            None => {
                let rejected = self.worker_url.to_string();
                self.worker_url = DEFAULT_WORKER_URL.into();
                Some(rejected)
            },
        };

        self.duplicates.validate()?;
        self.quota.validate()?;
        self.correlation.validate()?;
        self.export.normalize();

        Ok(ValidatedRelayConfig {
            raw: self,
            worker_url_fallback,
        })
    }
}

/// Validated config wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRelayConfig {
    raw: RelayConfig,
    worker_url_fallback: Option<String>,
}

impl ValidatedRelayConfig {
    /// Worker URL value that was rejected in favour of the default, if any.
    #[must_use]
    pub fn worker_url_fallback(&self) -> Option<&str> {
        self.worker_url_fallback.as_deref()
    }

    /// Borrow the raw config.
    #[must_use]
    pub const fn as_ref(&self) -> &RelayConfig {
        &self.raw
    }

    /// Consume the wrapper and return the raw config.
    #[must_use]
    pub fn into_inner(self) -> RelayConfig {
        self.raw
    }
}

impl AsRef<RelayConfig> for ValidatedRelayConfig {
    fn as_ref(&self) -> &RelayConfig {
        &self.raw
    }
}

impl std::ops::Deref for ValidatedRelayConfig {
    type Target = RelayConfig;

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}

/// Duplicate-suppression configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct DuplicatesConfig {
    /// Trailing window in which identical messages are counted.
    pub window_ms: u64,
    /// Occurrences allowed per window before further copies are dropped.
    pub threshold: u32,
    /// Upper bound on tracked signatures.
    pub max_signatures: u32,
}

impl Default for DuplicatesConfig {
    fn default() -> Self {
        Self {
            window_ms: DUPLICATE_WINDOW_DEFAULT_MS,
            threshold: DUPLICATE_THRESHOLD_DEFAULT,
            max_signatures: DUPLICATE_MAX_SIGNATURES_DEFAULT,
        }
    }
}

impl DuplicatesConfig {
    fn validate(&self) -> Result<(), ConfigSchemaError> {
        check_range(
            "duplicates",
            "windowMs",
            self.window_ms,
            DUPLICATE_WINDOW_MIN_MS,
            DUPLICATE_WINDOW_MAX_MS,
        )?;
        check_range(
            "duplicates",
            "threshold",
            u64::from(self.threshold),
            u64::from(DUPLICATE_THRESHOLD_MIN),
            u64::from(DUPLICATE_THRESHOLD_MAX),
        )?;
        check_range(
            "duplicates",
            "maxSignatures",
            u64::from(self.max_signatures),
            u64::from(DUPLICATE_MAX_SIGNATURES_MIN),
            u64::from(DUPLICATE_MAX_SIGNATURES_MAX),
        )
    }
}

/// Local send quota configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct QuotaConfig {
    /// Sends permitted per window.
    pub limit: u32,
    /// Quota window length.
    pub window_ms: u64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            limit: QUOTA_LIMIT_DEFAULT,
            window_ms: QUOTA_WINDOW_DEFAULT_MS,
        }
    }
}

impl QuotaConfig {
    fn validate(&self) -> Result<(), ConfigSchemaError> {
        check_range(
            "quota",
            "limit",
            u64::from(self.limit),
            u64::from(QUOTA_LIMIT_MIN),
            u64::from(QUOTA_LIMIT_MAX),
        )?;
        check_range(
            "quota",
            "windowMs",
            self.window_ms,
            QUOTA_WINDOW_MIN_MS,
            QUOTA_WINDOW_MAX_MS,
        )
    }
}

/// Error-chain heuristic configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct CorrelationConfig {
    /// Maximum gap between consecutive warn/error entries of one chain.
    pub chain_proximity_ms: u64,
    /// Minimum entries for a group to count as a chain.
    pub min_chain_entries: u32,
    /// Only report chains spanning at least two systems.
    pub require_cross_system: bool,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            chain_proximity_ms: CHAIN_PROXIMITY_DEFAULT_MS,
            min_chain_entries: CHAIN_MIN_ENTRIES_DEFAULT,
            require_cross_system: false,
        }
    }
}

impl CorrelationConfig {
    fn validate(&self) -> Result<(), ConfigSchemaError> {
        check_range(
            "correlation",
            "chainProximityMs",
            self.chain_proximity_ms,
            CHAIN_PROXIMITY_MIN_MS,
            CHAIN_PROXIMITY_MAX_MS,
        )?;
        check_range(
            "correlation",
            "minChainEntries",
            u64::from(self.min_chain_entries),
            u64::from(CHAIN_MIN_ENTRIES_MIN),
            u64::from(CHAIN_MIN_ENTRIES_MAX),
        )
    }
}

/// Export delivery configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct ExportConfig {
    /// Directory that receives exported files.
    pub output_dir: Box<str>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: ".".into(),
        }
    }
}

impl ExportConfig {
    fn normalize(&mut self) {
        let trimmed = self.output_dir.trim();
        self.output_dir = if trimmed.is_empty() {
            ".".into()
        } else {
            trimmed.into()
        };
    }
}

/// Parse a relay config from a JSON string, applying validation and normalization.
pub fn parse_relay_config_json(input: &str) -> Result<ValidatedRelayConfig, ErrorEnvelope> {
    let config: RelayConfig = serde_json::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_json"),
            format!("invalid config JSON: {error}"),
        )
    })?;

    config.validate_and_normalize().map_err(Into::into)
}

/// Parse a relay config from a TOML string, applying validation and normalization.
pub fn parse_relay_config_toml(input: &str) -> Result<ValidatedRelayConfig, ErrorEnvelope> {
    let config: RelayConfig = toml::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_toml"),
            format!("invalid config TOML: {error}"),
        )
    })?;

    config.validate_and_normalize().map_err(Into::into)
}

/// Validate a worker URL: http(s) only, no trailing slash.
fn normalize_worker_url(raw: &str) -> Option<Box<str>> {
    let trimmed = raw.trim();
    let parsed = Url::parse(trimmed).ok()?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return None;
    }
    parsed.host_str()?;
    Some(trimmed.trim_end_matches('/').into())
}

const fn check_range(
    section: &'static str,
    field: &'static str,
    value: u64,
    min: u64,
    max: u64,
) -> Result<(), ConfigSchemaError> {
    if value < min || value > max {
        return Err(ConfigSchemaError::LimitOutOfRange {
            section,
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

/// Schema validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSchemaError {
    /// The config version is not supported by this binary.
    UnsupportedVersion {
        /// Version found in the config.
        found: u32,
        /// Version supported by this crate.
        supported: u32,
    },
    /// A numeric limit is out of bounds.
    LimitOutOfRange {
        /// Schema section (e.g. `quota`).
        section: &'static str,
        /// Field name in the config file (e.g. `windowMs`).
        field: &'static str,
        /// Value provided.
        value: u64,
        /// Minimum allowed value.
        min: u64,
        /// Maximum allowed value.
        max: u64,
    },
}

impl ConfigSchemaError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::UnsupportedVersion { .. } => ErrorCode::new("config", "unsupported_version"),
            Self::LimitOutOfRange { .. } => ErrorCode::new("config", "limit_out_of_range"),
        }
    }
}

impl fmt::Display for ConfigSchemaError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedVersion { found, supported } => write!(
                formatter,
                "config version {found} is not supported (expected {supported})"
            ),
            Self::LimitOutOfRange {
                section,
                field,
                value,
                min,
                max,
            } => write!(
                formatter,
                "{section}.{field} = {value} is out of range ({min}..={max})"
            ),
        }
    }
}

impl std::error::Error for ConfigSchemaError {}

impl From<ConfigSchemaError> for ErrorEnvelope {
    fn from(error: ConfigSchemaError) -> Self {
        let envelope = Self::expected(error.error_code(), error.to_string());
        match error {
            ConfigSchemaError::UnsupportedVersion { found, supported } => envelope
                .with_metadata("found", found.to_string())
                .with_metadata("supported", supported.to_string()),
            ConfigSchemaError::LimitOutOfRange {
                section,
                field,
                value,
                min,
                max,
            } => envelope
                .with_metadata("section", section)
                .with_metadata("field", field)
                .with_metadata("value", value.to_string())
                .with_metadata("min", min.to_string())
                .with_metadata("max", max.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() -> Result<(), ConfigSchemaError> {
        let validated = RelayConfig::default().validate_and_normalize()?;
        assert!(!validated.enabled);
        assert_eq!(&*validated.worker_url, DEFAULT_WORKER_URL);
        assert_eq!(validated.worker_url_fallback(), None);
        Ok(())
    }

    #[test]
    fn trailing_slash_is_trimmed() -> Result<(), ConfigSchemaError> {
        let config = RelayConfig {
            worker_url: "https://logs.example.dev/".into(),
            ..RelayConfig::default()
        };
        let validated = config.validate_and_normalize()?;
        assert_eq!(&*validated.worker_url, "https://logs.example.dev");
        Ok(())
    }

    #[test]
    fn unusable_url_falls_back_to_default() -> Result<(), ConfigSchemaError> {
        for bad in ["", "not a url", "ftp://logs.example.dev", "file:///tmp/x"] {
            let config = RelayConfig {
                worker_url: bad.into(),
                ..RelayConfig::default()
            };
            let validated = config.validate_and_normalize()?;
            assert_eq!(&*validated.worker_url, DEFAULT_WORKER_URL);
            assert_eq!(validated.worker_url_fallback(), Some(bad));
        }
        Ok(())
    }

    #[test]
    fn out_of_range_limits_are_rejected() {
        let config = RelayConfig {
            quota: QuotaConfig {
                limit: 0,
                ..QuotaConfig::default()
            },
            ..RelayConfig::default()
        };
        let error = config.validate_and_normalize().err();
        assert!(matches!(
            error,
            Some(ConfigSchemaError::LimitOutOfRange {
                section: "quota",
                field: "limit",
                ..
            })
        ));
    }

    #[test]
    fn blank_export_dir_normalizes_to_cwd() -> Result<(), ConfigSchemaError> {
        let config = RelayConfig {
            export: ExportConfig {
                output_dir: "   ".into(),
            },
            ..RelayConfig::default()
        };
        let validated = config.validate_and_normalize()?;
        assert_eq!(&*validated.export.output_dir, ".");
        Ok(())
    }
}
