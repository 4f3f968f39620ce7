//! 适配器：按数据源名称路由读取请求，并记录读取指标

use crate::config::ModbusCollectorConfig;
use crate::device::ModbusDevice;
use crate::error::{AdapterError, ConfigError, ReadError};
use crate::tcp::TokioModbusTransport;
use crate::transport::DeviceLink;
use crate::types::DEFAULT_DEVICE_ID;
use domain::ChannelValue;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

pub struct ModbusAdapter {
    sources: BTreeMap<String, ModbusDevice>,
    links: BTreeMap<String, Arc<DeviceLink>>,
}

impl ModbusAdapter {
    /// 为每个设备建立 Modbus TCP 连接并创建数据源
    pub async fn connect(config: &ModbusCollectorConfig) -> Result<Self, AdapterError> {
        config.validate()?;
        let mut links = HashMap::new();
        for (device_id, device) in &config.devices {
            let unit_id = device.device_id.unwrap_or(DEFAULT_DEVICE_ID);
            let transport = TokioModbusTransport::connect(
                &device.host,
                device.port,
                unit_id,
                device.connect_timeout(),
            )
            .await
            .map_err(|e| AdapterError::Connection(device_id.clone(), e.to_string()))?;
            links.insert(
                device_id.clone(),
                Arc::new(DeviceLink::new(
                    device_id.clone(),
                    Arc::new(transport),
                    device.device_id,
                    device.request_depth,
                )),
            );
        }
        Self::with_links(config, links)
    }

    /// 使用预先建立的设备链路创建（键为设备 ID）
    pub fn with_links(
        config: &ModbusCollectorConfig,
        links: HashMap<String, Arc<DeviceLink>>,
    ) -> Result<Self, AdapterError> {
        config.validate()?;
        let mut sources = BTreeMap::new();
        let mut used_links = BTreeMap::new();
        for (source_id, source) in &config.sources {
            let link = links.get(&source.adapter_device).ok_or_else(|| {
                ConfigError::Invalid(
                    format!("sources.{}.adapter_device", source_id),
                    format!("no link for device \"{}\"", source.adapter_device),
                )
            })?;
            used_links.insert(source.adapter_device.clone(), link.clone());
            sources.insert(
                source_id.clone(),
                ModbusDevice::from_config(source_id.clone(), source, link.clone()),
            );
        }

        info!(
            target: "ems.modbus",
            sources = sources.len(),
            devices = used_links.len(),
            "modbus_adapter_ready"
        );

        Ok(Self {
            sources,
            links: used_links,
        })
    }

    pub fn source_ids(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    pub fn source(&self, source_id: &str) -> Option<&ModbusDevice> {
        self.sources.get(source_id)
    }

    pub fn link(&self, device_id: &str) -> Option<&Arc<DeviceLink>> {
        self.links.get(device_id)
    }

    /// 读取数据源的通道值；`channels` 为 None 时读取全部通道
    pub async fn read(
        &self,
        source_id: &str,
        channels: Option<&[String]>,
    ) -> Result<HashMap<String, ChannelValue>, AdapterError> {
        let device = self
            .sources
            .get(source_id)
            .ok_or_else(|| AdapterError::UnknownSource(source_id.to_string()))?;

        ems_telemetry::record_read();
        let started = Instant::now();
        let result = device.read_values(channels).await;
        ems_telemetry::record_read_duration_ms(started.elapsed().as_millis() as u64);

        match &result {
            Ok(values) => ems_telemetry::record_read_success(values.len() as u64),
            Err(e) => {
                ems_telemetry::record_read_error();
                if matches!(e, ReadError::Timeout(_)) {
                    ems_telemetry::record_read_timeout();
                }
                warn!(
                    target: "ems.modbus",
                    source_id = %source_id,
                    error = %e,
                    "source_read_failed"
                );
            }
        }

        result.map_err(AdapterError::from)
    }
}
