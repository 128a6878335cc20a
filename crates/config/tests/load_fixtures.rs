//! Loader tests against on-disk fixtures.

use console_relay_config::{
    DEFAULT_WORKER_URL, RelayConfig, RelayEnv, load_relay_config_from_path,
    parse_relay_config_json, to_pretty_json, to_pretty_toml,
};
use std::collections::BTreeMap;
use std::error::Error;
use std::path::{Path, PathBuf};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn toml_fixture_is_normalized() -> Result<(), Box<dyn Error>> {
    let config = load_relay_config_from_path(Some(&fixture("relay.toml")), &RelayEnv::default())?;

    assert!(config.enabled);
    assert!(config.owner);
    assert_eq!(&*config.worker_url, "https://logs.example.dev");
    assert_eq!(config.duplicates.window_ms, 2_000);
    assert_eq!(config.duplicates.threshold, 3);
    assert_eq!(config.quota.limit, 50);
    assert_eq!(config.correlation.chain_proximity_ms, 1_500);
    assert!(config.correlation.require_cross_system);
    assert_eq!(&*config.export.output_dir, "exports");
    Ok(())
}

#[test]
fn env_map_overrides_json_fixture() -> Result<(), Box<dyn Error>> {
    let mut map = BTreeMap::new();
    map.insert("LOG_WORKER_URL".to_string(), "ws://nope".to_string());
    map.insert("CONSOLE_RELAY_QUOTA_LIMIT".to_string(), "5".to_string());
    map.insert("ENABLE_DEBUG_LOGGER".to_string(), "no".to_string());
    let env = RelayEnv::from_map(&map)?;

    let config = load_relay_config_from_path(Some(&fixture("relay.json")), &env)?;

    assert!(!config.enabled);
    assert_eq!(config.quota.limit, 5);
    assert_eq!(&*config.worker_url, DEFAULT_WORKER_URL);
    assert_eq!(config.worker_url_fallback(), Some("ws://nope"));
    Ok(())
}

#[test]
fn missing_file_reports_path() -> Result<(), Box<dyn Error>> {
    let path = fixture("does-not-exist.json");
    let error = load_relay_config_from_path(Some(&path), &RelayEnv::default())
        .err()
        .ok_or("expected missing file error")?;

    assert_eq!(error.code.code(), "config_file_not_found");
    assert!(
        error
            .metadata_value("path")
            .is_some_and(|value| value.ends_with("does-not-exist.json"))
    );
    Ok(())
}

#[test]
fn unsupported_version_is_rejected() -> Result<(), Box<dyn Error>> {
    let error =
        load_relay_config_from_path(Some(&fixture("bad_version.json")), &RelayEnv::default())
            .err()
            .ok_or("expected version error")?;

    assert_eq!(error.code.code(), "unsupported_version");
    assert_eq!(error.metadata_value("found"), Some("7"));
    Ok(())
}

#[test]
fn pretty_output_reparses_to_same_config() -> Result<(), Box<dyn Error>> {
    let config = RelayConfig::default();
    let json = to_pretty_json(&config)?;
    assert!(json.ends_with('\n'));
    assert!(json.contains("\"workerUrl\""));

    let reparsed = parse_relay_config_json(&json)?;
    assert_eq!(reparsed.as_ref(), &config);

    let toml_text = to_pretty_toml(&config)?;
    assert!(toml_text.contains("[quota]"));
    Ok(())
}
