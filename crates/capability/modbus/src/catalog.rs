//! 通道目录：数据源上已校验、不可变的通道定义集合

use crate::config::ModbusSourceConfig;
use crate::error::ReadError;
use crate::types::Address;
use domain::ChannelCategory;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// 单个通道定义
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelDefinition {
    pub id: String,
    pub category: ChannelCategory,
    /// 起始地址
    pub address: Address,
    /// 地址数量（>= 1）
    pub count: u16,
}

impl ChannelDefinition {
    /// 通道占用的全部地址 `[address, address + count)`
    pub fn addresses(&self) -> impl Iterator<Item = Address> {
        let start = u32::from(self.address);
        let end = (start + u32::from(self.count)).min(u32::from(Address::MAX) + 1);
        (start..end).map(|a| a as Address)
    }
}

/// 归一化后的通道选择（排序、去重）；None 表示全部通道
pub type ChannelSelection = Option<BTreeSet<String>>;

#[derive(Debug, Clone, Default)]
pub struct ChannelCatalog {
    channels: BTreeMap<String, ChannelDefinition>,
}

impl ChannelCatalog {
    /// 从数据源配置构建（已禁用通道不进入目录）
    pub fn from_source(config: &ModbusSourceConfig) -> Self {
        let channels = config
            .enabled_channels()
            .map(|(id, channel)| {
                (
                    id.clone(),
                    ChannelDefinition {
                        id: id.clone(),
                        category: channel.channel_type.into(),
                        address: channel.address,
                        count: channel.size,
                    },
                )
            })
            .collect();
        Self { channels }
    }

    pub fn from_definitions(definitions: impl IntoIterator<Item = ChannelDefinition>) -> Self {
        let channels = definitions
            .into_iter()
            .map(|definition| (definition.id.clone(), definition))
            .collect();
        Self { channels }
    }

    pub fn get(&self, id: &str) -> Option<&ChannelDefinition> {
        self.channels.get(id)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelDefinition> {
        self.channels.values()
    }

    /// 归一化请求的通道子集
    ///
    /// 目录中不存在的通道 ID（含已禁用通道）被忽略，只读取其余通道。
    pub fn select(&self, requested: Option<&[String]>) -> ChannelSelection {
        let requested = requested?;
        let (known, unknown): (BTreeSet<&String>, BTreeSet<&String>) = requested
            .iter()
            .partition(|id| self.channels.contains_key(id.as_str()));
        if !unknown.is_empty() {
            let unknown: Vec<&str> = unknown.into_iter().map(String::as_str).collect();
            warn!(
                target: "ems.modbus",
                channels = %unknown.join(", "),
                "unknown_channels_ignored"
            );
        }
        Some(known.into_iter().cloned().collect())
    }

    /// 检查选择中的通道定义能否构建请求（数量 >= 1 且地址不越界）
    pub fn check_selected(&self, selection: &ChannelSelection) -> Result<(), ReadError> {
        for channel in self.selected(selection) {
            let end = u32::from(channel.address) + u32::from(channel.count);
            if channel.count == 0 || end > u32::from(Address::MAX) + 1 {
                return Err(ReadError::Build(format!(
                    "channel {} has invalid address range {} (count {})",
                    channel.id, channel.address, channel.count
                )));
            }
        }
        Ok(())
    }

    /// 选择中的通道（按 ID 排序）
    pub fn selected<'a>(
        &'a self,
        selection: &'a ChannelSelection,
    ) -> impl Iterator<Item = &'a ChannelDefinition> + 'a {
        self.channels
            .values()
            .filter(move |channel| match selection {
                Some(ids) => ids.contains(&channel.id),
                None => true,
            })
    }

    pub fn channels_for<'a>(
        &'a self,
        category: ChannelCategory,
        selection: &'a ChannelSelection,
    ) -> impl Iterator<Item = &'a ChannelDefinition> + 'a {
        self.selected(selection)
            .filter(move |channel| channel.category == category)
    }

    /// 类别下所需的全部地址（升序、去重）
    pub fn addresses_for(
        &self,
        category: ChannelCategory,
        selection: &ChannelSelection,
    ) -> Vec<Address> {
        let addresses: BTreeSet<Address> = self
            .channels_for(category, selection)
            .flat_map(|channel| channel.addresses())
            .collect();
        addresses.into_iter().collect()
    }
}
