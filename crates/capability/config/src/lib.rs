//! 应用运行配置加载。

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 应用运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// 采集配置文件路径（JSON）
    pub modbus_config_path: PathBuf,
    pub http_addr: String,
    pub poll_enabled: bool,
    pub poll_interval_ms: u64,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 从任意键值来源读取配置（测试中无需修改进程环境变量）。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let modbus_config_path = read_optional(&lookup, "EMS_MODBUS_CONFIG")
            .map(PathBuf::from)
            .ok_or_else(|| ConfigError::Missing("EMS_MODBUS_CONFIG".to_string()))?;
        let http_addr =
            read_optional(&lookup, "EMS_HTTP_ADDR").unwrap_or_else(|| "127.0.0.1:8080".to_string());
        let poll_enabled = read_bool_with_default(&lookup, "EMS_POLL_ENABLED", true);
        let poll_interval_ms = read_u64_with_default(&lookup, "EMS_POLL_INTERVAL_MS", 1000)?;
        if poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "EMS_POLL_INTERVAL_MS".to_string(),
                "0".to_string(),
            ));
        }

        Ok(Self {
            modbus_config_path,
            http_addr,
            poll_enabled,
            poll_interval_ms,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn read_u64_with_default<F>(lookup: &F, key: &str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = match lookup(key) {
        Some(value) => value,
        None => return Ok(default),
    };
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

fn read_bool_with_default<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "on"),
        None => default,
    }
}
