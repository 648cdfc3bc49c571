//! Configuration tests

use super::*;
use std::time::Duration;
use tempfile::NamedTempFile;

#[test]
fn test_config_serialization() {
    let config = Config::default();
    let yaml = serde_yaml::to_string(&config).unwrap();
    let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(config.version, parsed.version);
    assert_eq!(parsed.rotation.tick_interval(), Duration::from_millis(100));
}

#[test]
fn test_config_from_file() {
    let mut config = Config::default();
    let mut clock = crate::plugin::ProviderConfig::default();
    clock.display_duration = Some(10);
    config.providers.insert("clock".to_string(), clock);

    let temp_file = NamedTempFile::new().unwrap();
    config.save_to_file(temp_file.path()).unwrap();

    let loaded = Config::from_file(temp_file.path()).unwrap();
    assert_eq!(config.version, loaded.version);
    assert_eq!(loaded.provider("clock").display_duration, Some(10));
    assert!(loaded.provider("weather").enabled);
}

#[test]
fn test_partial_config_uses_defaults() {
    let yaml = r#"
version: "1.0"
executor:
  max_concurrent_updates: 2
providers:
  alert:
    live_priority: true
    trigger_file: /tmp/alert.txt
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.executor.max_concurrent_updates, 2);
    assert_eq!(config.executor.update_timeout(), Duration::from_secs(30));
    assert!(config.plugins.auto_load);

    let alert = config.provider("alert");
    assert!(alert.live_priority);
    assert!(alert.settings.contains_key("trigger_file"));
}

#[test]
fn test_config_validation() {
    assert!(Config::default().validate().is_ok());

    let mut config = Config::default();
    config.version = "2.0".to_string();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.rotation.tick_interval_ms = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.executor.max_concurrent_updates = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.executor.display_timeout_seconds = 0;
    assert!(config.validate().is_err());
}
