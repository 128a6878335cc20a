//! Environment variable parsing and merging.
//!
//! Every relay setting can be overridden from the environment. Env values are
//! applied after file values and before validation.

use crate::schema::{ConfigSchemaError, RelayConfig, ValidatedRelayConfig};
use console_relay_shared::{ErrorCode, ErrorEnvelope};
use std::collections::BTreeMap;
use std::fmt;

/// Env var for `enabled`.
pub const ENV_ENABLED: &str = "CONSOLE_RELAY_ENABLED";
/// Alias env var for `enabled`.
pub const ENV_ENABLED_ALIAS: &str = "ENABLE_DEBUG_LOGGER";
/// Env var for `workerUrl`.
pub const ENV_WORKER_URL: &str = "CONSOLE_RELAY_WORKER_URL";
/// Alias env var for `workerUrl`.
pub const ENV_WORKER_URL_ALIAS: &str = "LOG_WORKER_URL";
/// Env var for `owner`.
pub const ENV_OWNER: &str = "CONSOLE_RELAY_OWNER";
/// Env var for `duplicates.windowMs`.
pub const ENV_DUPLICATE_WINDOW_MS: &str = "CONSOLE_RELAY_DUPLICATE_WINDOW_MS";
/// Env var for `duplicates.threshold`.
pub const ENV_DUPLICATE_THRESHOLD: &str = "CONSOLE_RELAY_DUPLICATE_THRESHOLD";
/// Env var for `quota.limit`.
pub const ENV_QUOTA_LIMIT: &str = "CONSOLE_RELAY_QUOTA_LIMIT";
/// Env var for `quota.windowMs`.
pub const ENV_QUOTA_WINDOW_MS: &str = "CONSOLE_RELAY_QUOTA_WINDOW_MS";
/// Env var for `correlation.chainProximityMs`.
pub const ENV_CHAIN_PROXIMITY_MS: &str = "CONSOLE_RELAY_CHAIN_PROXIMITY_MS";
/// Env var for `export.outputDir`.
pub const ENV_EXPORT_DIR: &str = "CONSOLE_RELAY_EXPORT_DIR";

const ALL_ENV_VARS: [&str; 11] = [
    ENV_ENABLED,
    ENV_ENABLED_ALIAS,
    ENV_WORKER_URL,
    ENV_WORKER_URL_ALIAS,
    ENV_OWNER,
    ENV_DUPLICATE_WINDOW_MS,
    ENV_DUPLICATE_THRESHOLD,
    ENV_QUOTA_LIMIT,
    ENV_QUOTA_WINDOW_MS,
    ENV_CHAIN_PROXIMITY_MS,
    ENV_EXPORT_DIR,
];

/// Parsed env overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayEnv {
    /// Override for `enabled`.
    pub enabled: Option<bool>,
    /// Override for `workerUrl`; validated later, so an unusable value still
    /// reaches the fallback logic.
    pub worker_url: Option<Box<str>>,
    /// Override for `owner`.
    pub owner: Option<bool>,
    /// Override for `duplicates.windowMs`.
    pub duplicate_window_ms: Option<u64>,
    /// Override for `duplicates.threshold`.
    pub duplicate_threshold: Option<u32>,
    /// Override for `quota.limit`.
    pub quota_limit: Option<u32>,
    /// Override for `quota.windowMs`.
    pub quota_window_ms: Option<u64>,
    /// Override for `correlation.chainProximityMs`.
    pub chain_proximity_ms: Option<u64>,
    /// Override for `export.outputDir`.
    pub export_dir: Option<Box<str>>,
}

impl RelayEnv {
    /// Parse env overrides from a key/value map.
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self, EnvParseError> {
        Ok(Self {
            enabled: parse_optional_bool_any(map, &[ENV_ENABLED, ENV_ENABLED_ALIAS])?,
            worker_url: raw_optional_any(map, &[ENV_WORKER_URL, ENV_WORKER_URL_ALIAS]),
            owner: parse_optional_bool(map, ENV_OWNER)?,
            duplicate_window_ms: parse_optional_u64(map, ENV_DUPLICATE_WINDOW_MS)?,
            duplicate_threshold: parse_optional_u32(map, ENV_DUPLICATE_THRESHOLD)?,
            quota_limit: parse_optional_u32(map, ENV_QUOTA_LIMIT)?,
            quota_window_ms: parse_optional_u64(map, ENV_QUOTA_WINDOW_MS)?,
            chain_proximity_ms: parse_optional_u64(map, ENV_CHAIN_PROXIMITY_MS)?,
            export_dir: parse_optional_trimmed_string(map, ENV_EXPORT_DIR)?,
        })
    }

    /// Parse env overrides from the current process environment.
    pub fn from_std_env() -> Result<Self, EnvParseError> {
        let map = ALL_ENV_VARS
            .iter()
            .filter_map(|name| {
                std::env::var(name)
                    .ok()
                    .map(|value| ((*name).to_string(), value))
            })
            .collect();
        Self::from_map(&map)
    }
}

/// Apply env overrides to a config and validate the result.
pub fn apply_env_overrides(
    mut config: RelayConfig,
    env: &RelayEnv,
) -> Result<ValidatedRelayConfig, ConfigSchemaError> {
    set(&mut config.enabled, env.enabled);
    set(&mut config.owner, env.owner);
    if let Some(url) = env.worker_url.as_deref() {
        config.worker_url = url.into();
    }
    set(&mut config.duplicates.window_ms, env.duplicate_window_ms);
    set(&mut config.duplicates.threshold, env.duplicate_threshold);
    set(&mut config.quota.limit, env.quota_limit);
    set(&mut config.quota.window_ms, env.quota_window_ms);
    set(
        &mut config.correlation.chain_proximity_ms,
        env.chain_proximity_ms,
    );
    if let Some(dir) = env.export_dir.as_deref() {
        config.export.output_dir = dir.into();
    }

    config.validate_and_normalize()
}

fn set<T: Copy>(field: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *field = value;
    }
}

/// Validation failures when parsing env variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvParseError {
    /// An env var was present but empty after trimming.
    EmptyValue {
        /// Env var name.
        var: &'static str,
    },
    /// Boolean env var had an invalid value.
    InvalidBool {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
    /// Integer env var had an invalid value.
    InvalidInt {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
}

impl EnvParseError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::EmptyValue { .. } => ErrorCode::new("config", "empty_env_var"),
            Self::InvalidBool { .. } => ErrorCode::new("config", "invalid_env_bool"),
            Self::InvalidInt { .. } => ErrorCode::new("config", "invalid_env_int"),
        }
    }
}

impl fmt::Display for EnvParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyValue { var } => write!(formatter, "{var} must be non-empty"),
            Self::InvalidBool { var, .. } => write!(formatter, "{var} must be a boolean"),
            Self::InvalidInt { var, .. } => {
                write!(formatter, "{var} must be a non-negative integer")
            },
        }
    }
}

impl std::error::Error for EnvParseError {}

impl From<EnvParseError> for ErrorEnvelope {
    fn from(error: EnvParseError) -> Self {
        let envelope = Self::expected(error.error_code(), error.to_string());
        match error {
            EnvParseError::EmptyValue { var } => envelope.with_metadata("env_var", var),
            EnvParseError::InvalidBool { var, value } | EnvParseError::InvalidInt { var, value } => {
                envelope
                    .with_metadata("env_var", var)
                    .with_metadata("value", value)
            },
        }
    }
}

fn raw_optional_any(map: &BTreeMap<String, String>, vars: &[&'static str]) -> Option<Box<str>> {
    vars.iter()
        .find_map(|var| map.get(*var))
        .map(|raw| raw.trim().to_owned().into_boxed_str())
}

fn parse_optional_trimmed_string(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<Box<str>>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    Ok(Some(trimmed.to_owned().into_boxed_str()))
}

fn parse_optional_u64(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<u64>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    trimmed
        .parse::<u64>()
        .map(Some)
        .map_err(|_| EnvParseError::InvalidInt {
            var,
            value: raw.clone(),
        })
}

fn parse_optional_u32(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<u32>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    trimmed
        .parse::<u32>()
        .map(Some)
        .map_err(|_| EnvParseError::InvalidInt {
            var,
            value: raw.clone(),
        })
}

fn parse_optional_bool(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<bool>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    match trimmed.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(Some(true)),
        "false" | "0" | "no" | "off" => Ok(Some(false)),
        _ => Err(EnvParseError::InvalidBool {
            var,
            value: raw.clone(),
        }),
    }
}

fn parse_optional_bool_any(
    map: &BTreeMap<String, String>,
    vars: &[&'static str],
) -> Result<Option<bool>, EnvParseError> {
    for var in vars {
        if map.contains_key(*var) {
            return parse_optional_bool(map, var);
        }
    }
    Ok(None)
}
