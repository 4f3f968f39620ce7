use ems_config::{AppConfig, ConfigError};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn load_config_with_defaults() {
    let config =
        AppConfig::from_lookup(lookup(&[("EMS_MODBUS_CONFIG", "collector.json")])).expect("config");
    assert_eq!(config.modbus_config_path, Path::new("collector.json"));
    assert_eq!(config.http_addr, "127.0.0.1:8080");
    assert!(config.poll_enabled);
    assert_eq!(config.poll_interval(), Duration::from_millis(1000));
}

#[test]
fn load_config_overrides() {
    let config = AppConfig::from_lookup(lookup(&[
        ("EMS_MODBUS_CONFIG", "/etc/ems/collector.json"),
        ("EMS_HTTP_ADDR", "0.0.0.0:9000"),
        ("EMS_POLL_ENABLED", "off"),
        ("EMS_POLL_INTERVAL_MS", "250"),
    ]))
    .expect("config");
    assert_eq!(config.http_addr, "0.0.0.0:9000");
    assert!(!config.poll_enabled);
    assert_eq!(config.poll_interval_ms, 250);
}

#[test]
fn missing_modbus_config_is_error() {
    let err = AppConfig::from_lookup(lookup(&[("EMS_MODBUS_CONFIG", "")])).unwrap_err();
    assert!(matches!(err, ConfigError::Missing(ref key) if key == "EMS_MODBUS_CONFIG"));
}

#[test]
fn invalid_poll_interval_is_error() {
    let err = AppConfig::from_lookup(lookup(&[
        ("EMS_MODBUS_CONFIG", "collector.json"),
        ("EMS_POLL_INTERVAL_MS", "soon"),
    ]))
    .unwrap_err();
    assert_eq!(err.to_string(), "invalid value for EMS_POLL_INTERVAL_MS: soon");

    let err = AppConfig::from_lookup(lookup(&[
        ("EMS_MODBUS_CONFIG", "collector.json"),
        ("EMS_POLL_INTERVAL_MS", "0"),
    ]))
    .unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_, _)));
}

#[test]
fn load_config_from_env() {
    // Rust 2024 中 set_var 需要显式标注 unsafe（测试进程内可控）。
    unsafe {
        std::env::set_var("EMS_MODBUS_CONFIG", "from-env.json");
        std::env::set_var("EMS_HTTP_ADDR", "127.0.0.1:8081");
    }

    let config = AppConfig::from_env().expect("config");
    assert_eq!(config.http_addr, "127.0.0.1:8081");
    assert_eq!(config.modbus_config_path, Path::new("from-env.json"));
}
