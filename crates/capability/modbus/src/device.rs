//! 数据源读取：`read_values` 是读取引擎的唯一入口

use crate::assembler::assemble;
use crate::catalog::ChannelCatalog;
use crate::config::{ModbusSourceConfig, OptimizationConfig};
use crate::cycle::run_cycle;
use crate::error::ReadError;
use crate::optimizer::RangeCache;
use crate::request::build_requests;
use crate::transport::DeviceLink;
use domain::ChannelValue;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// 设备链路上的一个数据源
pub struct ModbusDevice {
    source_id: String,
    catalog: ChannelCatalog,
    optimization: OptimizationConfig,
    read_timeout: Duration,
    link: Arc<DeviceLink>,
    ranges: RangeCache,
}

impl ModbusDevice {
    pub fn new(
        source_id: impl Into<String>,
        catalog: ChannelCatalog,
        optimization: OptimizationConfig,
        read_timeout: Duration,
        link: Arc<DeviceLink>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            catalog,
            optimization,
            read_timeout,
            link,
            ranges: RangeCache::new(),
        }
    }

    /// 从已校验的数据源配置创建
    pub fn from_config(
        source_id: impl Into<String>,
        config: &ModbusSourceConfig,
        link: Arc<DeviceLink>,
    ) -> Self {
        Self::new(
            source_id,
            ChannelCatalog::from_source(config),
            config.optimization.clone(),
            config.read_timeout(),
            link,
        )
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn catalog(&self) -> &ChannelCatalog {
        &self.catalog
    }

    pub fn link(&self) -> &Arc<DeviceLink> {
        &self.link
    }

    /// 区间计划实际计算的次数（相同通道选择的重复读取会复用上一次的计划）
    pub fn range_computations(&self) -> u64 {
        self.ranges.computations()
    }

    /// 读取通道值；`channels` 为 None 时读取全部通道
    ///
    /// 设备锁在整个周期内持有，任何结果返回前都已释放。
    pub async fn read_values(
        &self,
        channels: Option<&[String]>,
    ) -> Result<HashMap<String, ChannelValue>, ReadError> {
        let selection = self.catalog.select(channels);
        if selection.as_ref().is_some_and(|ids| ids.is_empty()) {
            return Ok(HashMap::new());
        }
        self.catalog.check_selected(&selection)?;

        let plan = self
            .ranges
            .get_or_compute(&self.catalog, &selection, &self.optimization);

        let guard = self.link.lock().await;
        trace!(target: "ems.modbus", source_id = %self.source_id, device = %self.link.name(), "device_lock_acquired");

        let requests = build_requests(&plan, self.link.device_id(), self.link.transactions());
        debug!(
            target: "ems.modbus",
            source_id = %self.source_id,
            requests = requests.len(),
            "read_cycle_started"
        );
        let outcome = run_cycle(&self.source_id, &self.link, requests, self.read_timeout).await;

        drop(guard);
        trace!(target: "ems.modbus", source_id = %self.source_id, device = %self.link.name(), "device_lock_released");

        let accumulator = outcome?;
        Ok(assemble(&self.catalog, &selection, &accumulator))
    }
}

impl std::fmt::Debug for ModbusDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModbusDevice")
            .field("source_id", &self.source_id)
            .field("channels", &self.catalog.len())
            .field("link", &self.link)
            .finish()
    }
}
