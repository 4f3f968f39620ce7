//! 采集配置模型
//!
//! ## 配置格式
//!
//! ```json
//! {
//!   "devices": {
//!     "plc-1": { "host": "192.168.1.100", "port": 502, "device_id": 1, "request_depth": 4 }
//!   },
//!   "sources": {
//!     "meter-1": {
//!       "adapter_device": "plc-1",
//!       "read_timeout_ms": 2000,
//!       "optimization": { "enabled": true, "coil_max_gap": 16, "register_max_gap": 8 },
//!       "channels": {
//!         "voltage": { "type": "holding_register", "address": 100, "size": 2 },
//!         "#spare": { "type": "coil", "address": 7 }
//!       }
//!     }
//!   }
//! }
//! ```

use crate::error::ConfigError;
use domain::ChannelCategory;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// 以此前缀开头的通道键视为已禁用
pub const DISABLED_CHANNEL_PREFIX: &str = "#";

/// 通道类型（配置文件中的 `type` 字段）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModbusChannelType {
    Coil,
    DiscreteInput,
    InputRegister,
    HoldingRegister,
}

impl From<ModbusChannelType> for ChannelCategory {
    fn from(value: ModbusChannelType) -> Self {
        match value {
            ModbusChannelType::Coil => ChannelCategory::Coil,
            ModbusChannelType::DiscreteInput => ChannelCategory::DiscreteInput,
            ModbusChannelType::InputRegister => ChannelCategory::InputRegister,
            ModbusChannelType::HoldingRegister => ChannelCategory::HoldingRegister,
        }
    }
}

/// 通道配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModbusChannelConfig {
    /// 通道类型
    #[serde(rename = "type")]
    pub channel_type: ModbusChannelType,
    /// 起始地址
    pub address: u16,
    /// 地址数量（大于 1 时读取为数组）
    #[serde(default = "default_size")]
    pub size: u16,
}

fn default_size() -> u16 {
    1
}

/// 读取优化选项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationConfig {
    /// 是否合并相邻地址区间
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// 线圈/离散输入合并时允许的最大地址间隔
    #[serde(default = "default_coil_max_gap")]
    pub coil_max_gap: u16,
    /// 寄存器合并时允许的最大地址间隔
    #[serde(default = "default_register_max_gap")]
    pub register_max_gap: u16,
}

fn default_enabled() -> bool {
    true
}

fn default_coil_max_gap() -> u16 {
    16
}

fn default_register_max_gap() -> u16 {
    8
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            coil_max_gap: default_coil_max_gap(),
            register_max_gap: default_register_max_gap(),
        }
    }
}

impl OptimizationConfig {
    /// 类别对应的最大间隔
    pub fn max_gap(&self, category: ChannelCategory) -> u16 {
        if category.is_discrete() {
            self.coil_max_gap
        } else {
            self.register_max_gap
        }
    }

    fn validate(&self, source_id: &str) -> Result<(), ConfigError> {
        if self.coil_max_gap == 0 {
            return Err(ConfigError::Invalid(
                format!("sources.{}.optimization.coil_max_gap", source_id),
                "must be 1 or more".to_string(),
            ));
        }
        if self.register_max_gap == 0 {
            return Err(ConfigError::Invalid(
                format!("sources.{}.optimization.register_max_gap", source_id),
                "must be 1 or more".to_string(),
            ));
        }
        Ok(())
    }
}

/// 数据源配置（一个数据源对应设备上的一组通道）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModbusSourceConfig {
    /// 显示名称（缺省为数据源 ID）
    #[serde(default)]
    pub name: Option<String>,
    /// 所属设备 ID（对应 `devices` 中的键）
    pub adapter_device: String,
    /// 通道配置
    #[serde(default)]
    pub channels: BTreeMap<String, ModbusChannelConfig>,
    /// 读取优化选项
    #[serde(default)]
    pub optimization: OptimizationConfig,
    /// 读取超时（毫秒）
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,
}

fn default_read_timeout() -> u64 {
    10_000
}

impl ModbusSourceConfig {
    /// 启用的通道（排除 `#` 开头的键）
    pub fn enabled_channels(&self) -> impl Iterator<Item = (&String, &ModbusChannelConfig)> {
        self.channels
            .iter()
            .filter(|(id, _)| !id.starts_with(DISABLED_CHANNEL_PREFIX))
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn validate(&self, source_id: &str) -> Result<(), ConfigError> {
        if self.read_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                format!("sources.{}.read_timeout_ms", source_id),
                "must be at least 1 millisecond".to_string(),
            ));
        }
        if self.adapter_device.trim().is_empty() {
            return Err(ConfigError::Invalid(
                format!("sources.{}.adapter_device", source_id),
                "must be set".to_string(),
            ));
        }
        if self.enabled_channels().next().is_none() {
            return Err(ConfigError::Invalid(
                format!("sources.{}.channels", source_id),
                "source must have 1 or more channels".to_string(),
            ));
        }
        for (channel_id, channel) in self.enabled_channels() {
            if channel.size == 0 {
                return Err(ConfigError::Invalid(
                    format!("sources.{}.channels.{}.size", source_id, channel_id),
                    "must be 1 or higher".to_string(),
                ));
            }
            let last = u32::from(channel.address) + u32::from(channel.size) - 1;
            if last > u32::from(u16::MAX) {
                return Err(ConfigError::Invalid(
                    format!("sources.{}.channels.{}.address", source_id, channel_id),
                    format!(
                        "address {} with size {} exceeds the 16-bit address space",
                        channel.address, channel.size
                    ),
                ));
            }
        }
        self.optimization.validate(source_id)
    }
}

/// 设备（链路）配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModbusDeviceConfig {
    /// Modbus 服务器主机地址
    pub host: String,
    /// Modbus 服务器端口（默认 502）
    #[serde(default = "default_modbus_port")]
    pub port: u16,
    /// 从站 ID（缺省为 1）
    #[serde(default)]
    pub device_id: Option<u8>,
    /// 未收到响应前允许发出的最大请求数；0 表示不使用事务关联，逐个收发
    #[serde(default = "default_request_depth")]
    pub request_depth: u16,
    /// 连接超时（毫秒）
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
}

fn default_modbus_port() -> u16 {
    502
}

fn default_request_depth() -> u16 {
    1
}

fn default_connect_timeout() -> u64 {
    10_000
}

impl ModbusDeviceConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn validate(&self, device_id: &str) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid(
                format!("devices.{}.host", device_id),
                "address of the modbus server can not be empty".to_string(),
            ));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid(
                format!("devices.{}.port", device_id),
                "0 is not a valid port number".to_string(),
            ));
        }
        Ok(())
    }
}

/// 采集服务配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModbusCollectorConfig {
    #[serde(default)]
    pub devices: BTreeMap<String, ModbusDeviceConfig>,
    #[serde(default)]
    pub sources: BTreeMap<String, ModbusSourceConfig>,
}

impl ModbusCollectorConfig {
    /// 从 JSON 字符串解析并校验
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: ModbusCollectorConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::Invalid(
                "sources".to_string(),
                "configuration must have 1 or more modbus sources".to_string(),
            ));
        }
        for (device_id, device) in &self.devices {
            device.validate(device_id)?;
        }
        for (source_id, source) in &self.sources {
            source.validate(source_id)?;
            if !self.devices.contains_key(&source.adapter_device) {
                let existing: Vec<&str> = self.devices.keys().map(String::as_str).collect();
                return Err(ConfigError::Invalid(
                    format!("sources.{}.adapter_device", source_id),
                    format!(
                        "device \"{}\" does not exist, existing devices are {:?}",
                        source.adapter_device, existing
                    ),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"{
        "devices": { "plc-1": { "host": "192.168.1.100", "request_depth": 4 } },
        "sources": {
            "meter-1": {
                "adapter_device": "plc-1",
                "channels": {
                    "voltage": { "type": "holding_register", "address": 100, "size": 2 },
                    "running": { "type": "coil", "address": 7 },
                    "#spare": { "type": "coil", "address": 8 }
                }
            }
        }
    }"##;

    #[test]
    fn test_parse_config_with_defaults() {
        let config = ModbusCollectorConfig::from_json(SAMPLE).unwrap();
        let device = &config.devices["plc-1"];
        assert_eq!(device.port, 502);
        assert_eq!(device.device_id, None);
        assert_eq!(device.request_depth, 4);
        assert_eq!(device.connect_timeout_ms, 10_000);

        let source = &config.sources["meter-1"];
        assert_eq!(source.read_timeout_ms, 10_000);
        assert!(source.optimization.enabled);
        assert_eq!(source.optimization.coil_max_gap, 16);
        assert_eq!(source.optimization.register_max_gap, 8);
        assert_eq!(source.channels["running"].size, 1);
        assert_eq!(
            source.channels["voltage"].channel_type,
            ModbusChannelType::HoldingRegister
        );
    }

    #[test]
    fn test_disabled_channels_are_skipped() {
        let config = ModbusCollectorConfig::from_json(SAMPLE).unwrap();
        let ids: Vec<&String> = config.sources["meter-1"]
            .enabled_channels()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec!["running", "voltage"]);
    }

    #[test]
    fn test_max_gap_per_category() {
        let optimization = OptimizationConfig {
            enabled: true,
            coil_max_gap: 3,
            register_max_gap: 5,
        };
        assert_eq!(optimization.max_gap(ChannelCategory::Coil), 3);
        assert_eq!(optimization.max_gap(ChannelCategory::DiscreteInput), 3);
        assert_eq!(optimization.max_gap(ChannelCategory::InputRegister), 5);
        assert_eq!(optimization.max_gap(ChannelCategory::HoldingRegister), 5);
    }

    #[test]
    fn test_rejects_unknown_device() {
        let json = r#"{
            "devices": { "plc-1": { "host": "localhost" } },
            "sources": { "s": { "adapter_device": "plc-2",
                "channels": { "a": { "type": "coil", "address": 1 } } } }
        }"#;
        let err = ModbusCollectorConfig::from_json(json).unwrap_err();
        assert!(err.to_string().contains("sources.s.adapter_device"));
    }

    #[test]
    fn test_rejects_address_overflow() {
        let json = r#"{
            "devices": { "plc-1": { "host": "localhost" } },
            "sources": { "s": { "adapter_device": "plc-1",
                "channels": { "a": { "type": "input_register", "address": 65535, "size": 2 } } } }
        }"#;
        let err = ModbusCollectorConfig::from_json(json).unwrap_err();
        assert!(err.to_string().contains("16-bit address space"));
    }

    #[test]
    fn test_accepts_last_address() {
        let json = r#"{
            "devices": { "plc-1": { "host": "localhost" } },
            "sources": { "s": { "adapter_device": "plc-1",
                "channels": { "a": { "type": "input_register", "address": 65534, "size": 2 } } } }
        }"#;
        assert!(ModbusCollectorConfig::from_json(json).is_ok());
    }

    #[test]
    fn test_rejects_zero_size_and_zero_gap() {
        let json = r#"{
            "devices": { "plc-1": { "host": "localhost" } },
            "sources": { "s": { "adapter_device": "plc-1",
                "channels": { "a": { "type": "coil", "address": 1, "size": 0 } } } }
        }"#;
        let err = ModbusCollectorConfig::from_json(json).unwrap_err();
        assert!(err.to_string().contains("sources.s.channels.a.size"));

        let json = r#"{
            "devices": { "plc-1": { "host": "localhost" } },
            "sources": { "s": { "adapter_device": "plc-1",
                "optimization": { "register_max_gap": 0 },
                "channels": { "a": { "type": "coil", "address": 1 } } } }
        }"#;
        let err = ModbusCollectorConfig::from_json(json).unwrap_err();
        assert!(err.to_string().contains("register_max_gap"));
    }

    #[test]
    fn test_rejects_source_without_enabled_channels() {
        let json = r##"{
            "devices": { "plc-1": { "host": "localhost" } },
            "sources": { "s": { "adapter_device": "plc-1",
                "channels": { "#a": { "type": "coil", "address": 1 } } } }
        }"##;
        let err = ModbusCollectorConfig::from_json(json).unwrap_err();
        assert!(err.to_string().contains("1 or more channels"));
    }

    #[test]
    fn test_rejects_empty_sources_and_bad_json() {
        let err = ModbusCollectorConfig::from_json(r#"{"devices": {}}"#).unwrap_err();
        assert!(err.to_string().contains("1 or more modbus sources"));

        let err = ModbusCollectorConfig::from_json("{").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
