//! Config loading helpers (file + env).
//!
//! The loader is responsible for deterministic merge order and surfacing
//! user-facing errors as typed `ErrorEnvelope`s.

use crate::{RelayConfig, RelayEnv, ValidatedRelayConfig, apply_env_overrides};
use console_relay_shared::{ErrorCode, ErrorEnvelope};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Json,
    Toml,
}

/// Load the relay config from sources using a deterministic precedence order.
///
/// Precedence (highest wins):
/// - env overrides (`RelayEnv`)
/// - config JSON (file content)
/// - defaults (`RelayConfig::default()`)
pub fn load_relay_config_from_sources(
    config_json: Option<&str>,
    env: &RelayEnv,
) -> Result<ValidatedRelayConfig, ErrorEnvelope> {
    let config = match config_json {
        None => RelayConfig::default(),
        Some(input) => parse_config_unvalidated(input, ConfigFormat::Json)?,
    };

    finish(config, env)
}

/// Load the relay config from an optional file path.
pub fn load_relay_config_from_path(
    config_path: Option<&Path>,
    env: &RelayEnv,
) -> Result<ValidatedRelayConfig, ErrorEnvelope> {
    let config = match config_path {
        None => RelayConfig::default(),
        Some(path) => {
            let config_text = read_config_file(path)?;
            let format = detect_config_format(path)?;
            parse_config_unvalidated(&config_text, format)?
        },
    };

    finish(config, env)
}

/// Load the relay config from std env and an optional file path.
pub fn load_relay_config_std_env(
    config_path: Option<&Path>,
) -> Result<ValidatedRelayConfig, ErrorEnvelope> {
    let env = RelayEnv::from_std_env().map_err(ErrorEnvelope::from)?;
    load_relay_config_from_path(config_path, &env)
}

/// Serialize the config as deterministic pretty JSON (with trailing newline).
pub fn to_pretty_json(config: &RelayConfig) -> Result<String, ErrorEnvelope> {
    let mut output = serde_json::to_string_pretty(config).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::internal(),
            format!("failed to serialize config: {error}"),
        )
    })?;
    output.push('\n');
    Ok(output)
}

/// Serialize the config as deterministic pretty TOML (with trailing newline).
pub fn to_pretty_toml(config: &RelayConfig) -> Result<String, ErrorEnvelope> {
    let mut output = toml::to_string_pretty(config).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::new("config", "serialize_toml"),
            format!("failed to serialize config TOML: {error}"),
        )
    })?;
    output.push('\n');
    Ok(output)
}

fn finish(config: RelayConfig, env: &RelayEnv) -> Result<ValidatedRelayConfig, ErrorEnvelope> {
    // env is applied last and also validates/normalizes the resulting config.
    let validated = apply_env_overrides(config, env)?;
    if let Some(rejected) = validated.worker_url_fallback() {
        tracing::warn!(
            rejected,
            fallback = %validated.worker_url,
            "worker URL unusable; using default"
        );
    }
    Ok(validated)
}

fn parse_config_unvalidated(
    input: &str,
    format: ConfigFormat,
) -> Result<RelayConfig, ErrorEnvelope> {
    match format {
        ConfigFormat::Json => serde_json::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_json"),
                format!("invalid config JSON: {error}"),
            )
            .with_metadata("source", "config")
        }),
        ConfigFormat::Toml => toml::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_toml"),
                format!("invalid config TOML: {error}"),
            )
            .with_metadata("source", "config")
        }),
    }
}

fn read_config_file(path: &Path) -> Result<String, ErrorEnvelope> {
    std::fs::read_to_string(path).map_err(|error| {
        let code = match error.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::new("config", "config_file_not_found"),
            std::io::ErrorKind::PermissionDenied => {
                ErrorCode::new("config", "config_file_permission_denied")
            },
            _ => ErrorCode::new("config", "config_file_io"),
        };

        ErrorEnvelope::expected(code, format!("failed to read config file: {error}"))
            .with_metadata("path", path.to_string_lossy().to_string())
    })
}

fn detect_config_format(path: &Path) -> Result<ConfigFormat, ErrorEnvelope> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        None | Some("json") => Ok(ConfigFormat::Json),
        Some("toml") => Ok(ConfigFormat::Toml),
        Some(other) => Err(ErrorEnvelope::expected(
            ErrorCode::new("config", "unsupported_format"),
            "unsupported config format; use .json or .toml",
        )
        .with_metadata("extension", other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_file_values() -> Result<(), ErrorEnvelope> {
        let env = RelayEnv {
            quota_limit: Some(25),
            ..RelayEnv::default()
        };
        let config = load_relay_config_from_sources(
            Some(r#"{"enabled": true, "quota": {"limit": 10}}"#),
            &env,
        )?;
        assert!(config.enabled);
        assert_eq!(config.quota.limit, 25);
        Ok(())
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result =
            load_relay_config_from_sources(Some(r#"{"workerURL": "x"}"#), &RelayEnv::default());
        let error = result.err();
        assert_eq!(
            error.map(|error| error.code),
            Some(ErrorCode::new("config", "invalid_json"))
        );
    }

    #[test]
    fn unsupported_extension_is_reported() {
        let error = detect_config_format(Path::new("relay.yaml")).err();
        assert_eq!(
            error.as_ref().and_then(|error| error.metadata_value("extension")),
            Some("yaml")
        );
    }
}
