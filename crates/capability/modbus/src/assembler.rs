//! 结果组装：把按地址累积的原始值映射回通道
//!
//! 多地址通道缺少任一地址时整个通道不出现在结果中。

use crate::catalog::{ChannelCatalog, ChannelSelection};
use crate::error::ReadError;
use crate::types::{Address, ReadRequest, ResponsePayload};
use domain::{ChannelCategory, ChannelValue, RawValue};
use std::collections::HashMap;

/// 读取周期内按类别累积的 `地址 -> 原始值`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseAccumulator {
    values: HashMap<ChannelCategory, HashMap<Address, RawValue>>,
}

impl ResponseAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 合并一个成功响应；响应值按请求起始地址依次对应，超出请求数量的值被忽略
    pub fn merge(&mut self, request: &ReadRequest, payload: ResponsePayload) -> Result<(), ReadError> {
        if payload.category() != request.category {
            return Err(ReadError::Protocol(format!(
                "response for {} request at address {} carried {} data",
                request.category,
                request.address,
                payload.category()
            )));
        }
        let raw: Vec<RawValue> = match payload {
            ResponsePayload::Coils(values) | ResponsePayload::DiscreteInputs(values) => {
                values.into_iter().map(RawValue::Discrete).collect()
            }
            ResponsePayload::InputRegisters(values) | ResponsePayload::HoldingRegisters(values) => {
                values.into_iter().map(RawValue::Register).collect()
            }
        };
        let bank = self.values.entry(request.category).or_default();
        for (offset, value) in raw.into_iter().take(usize::from(request.quantity)).enumerate() {
            let Some(address) = u16::try_from(offset)
                .ok()
                .and_then(|offset| request.address.checked_add(offset))
            else {
                break;
            };
            bank.insert(address, value);
        }
        Ok(())
    }

    pub fn get(&self, category: ChannelCategory, address: Address) -> Option<RawValue> {
        self.values
            .get(&category)
            .and_then(|bank| bank.get(&address))
            .copied()
    }

    /// 累积的地址总数
    pub fn len(&self) -> usize {
        self.values.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 组装选中通道的值
pub fn assemble(
    catalog: &ChannelCatalog,
    selection: &ChannelSelection,
    accumulator: &ResponseAccumulator,
) -> HashMap<String, ChannelValue> {
    let mut result = HashMap::new();
    for channel in catalog.selected(selection) {
        if channel.count == 1 {
            if let Some(value) = accumulator.get(channel.category, channel.address) {
                result.insert(channel.id.clone(), value.into());
            }
            continue;
        }

        let values: Option<Vec<RawValue>> = channel
            .addresses()
            .map(|address| accumulator.get(channel.category, address))
            .collect();
        let Some(values) = values else {
            continue;
        };
        let value = if channel.category.is_discrete() {
            values
                .iter()
                .map(RawValue::as_bool)
                .collect::<Option<Vec<bool>>>()
                .map(ChannelValue::DiscreteArray)
        } else {
            values
                .iter()
                .map(RawValue::as_register)
                .collect::<Option<Vec<u16>>>()
                .map(ChannelValue::RegisterArray)
        };
        if let Some(value) = value {
            result.insert(channel.id.clone(), value);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ChannelDefinition;

    fn request(category: ChannelCategory, address: u16, quantity: u16) -> ReadRequest {
        ReadRequest {
            category,
            address,
            quantity,
            device_id: 1,
            transaction_id: Some(1),
        }
    }

    fn catalog() -> ChannelCatalog {
        ChannelCatalog::from_definitions(vec![
            ChannelDefinition {
                id: "single".to_string(),
                category: ChannelCategory::HoldingRegister,
                address: 0,
                count: 1,
            },
            ChannelDefinition {
                id: "array".to_string(),
                category: ChannelCategory::HoldingRegister,
                address: 1,
                count: 3,
            },
            ChannelDefinition {
                id: "flags".to_string(),
                category: ChannelCategory::Coil,
                address: 4,
                count: 2,
            },
        ])
    }

    #[test]
    fn assembles_scalars_and_arrays() {
        let mut accumulator = ResponseAccumulator::new();
        accumulator
            .merge(
                &request(ChannelCategory::HoldingRegister, 0, 4),
                ResponsePayload::HoldingRegisters(vec![7, 1, 2, 3]),
            )
            .expect("merge registers");
        accumulator
            .merge(
                &request(ChannelCategory::Coil, 4, 2),
                ResponsePayload::Coils(vec![true, false]),
            )
            .expect("merge coils");

        let values = assemble(&catalog(), &None, &accumulator);
        assert_eq!(values.len(), 3);
        assert_eq!(values["single"], ChannelValue::Register(7));
        assert_eq!(values["array"], ChannelValue::RegisterArray(vec![1, 2, 3]));
        assert_eq!(values["flags"], ChannelValue::DiscreteArray(vec![true, false]));
    }

    #[test]
    fn partially_read_array_is_omitted() {
        let mut accumulator = ResponseAccumulator::new();
        accumulator
            .merge(
                &request(ChannelCategory::HoldingRegister, 0, 4),
                ResponsePayload::HoldingRegisters(vec![7, 1, 2]),
            )
            .expect("merge");

        let values = assemble(&catalog(), &None, &accumulator);
        assert_eq!(values.len(), 1);
        assert_eq!(values["single"], ChannelValue::Register(7));
        assert!(!values.contains_key("array"));
    }

    #[test]
    fn selection_limits_result() {
        let mut accumulator = ResponseAccumulator::new();
        accumulator
            .merge(
                &request(ChannelCategory::HoldingRegister, 0, 4),
                ResponsePayload::HoldingRegisters(vec![7, 1, 2, 3]),
            )
            .expect("merge");
        let catalog = catalog();
        let selection = catalog.select(Some(["array".to_string()].as_slice()));
        let values = assemble(&catalog, &selection, &accumulator);
        assert_eq!(values.len(), 1);
        assert!(values.contains_key("array"));
    }

    #[test]
    fn merge_ignores_values_beyond_quantity() {
        let mut accumulator = ResponseAccumulator::new();
        accumulator
            .merge(
                &request(ChannelCategory::InputRegister, 65534, 2),
                ResponsePayload::InputRegisters(vec![1, 2, 3, 4]),
            )
            .expect("merge");
        assert_eq!(accumulator.len(), 2);
        assert_eq!(
            accumulator.get(ChannelCategory::InputRegister, 65535),
            Some(RawValue::Register(2))
        );
    }

    #[test]
    fn merge_rejects_category_mismatch() {
        let mut accumulator = ResponseAccumulator::new();
        let err = accumulator
            .merge(
                &request(ChannelCategory::Coil, 0, 1),
                ResponsePayload::HoldingRegisters(vec![1]),
            )
            .unwrap_err();
        assert!(matches!(err, ReadError::Protocol(_)));
        assert!(accumulator.is_empty());
    }
}
