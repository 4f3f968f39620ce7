pub mod data;

pub use data::{ChannelValue, RawValue};

use std::fmt;

/// Modbus 通道的数据类别（四种可寻址数据区）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChannelCategory {
    /// 线圈（可读写的离散量）
    Coil,
    /// 离散输入（只读离散量）
    DiscreteInput,
    /// 输入寄存器（只读 16 位字）
    InputRegister,
    /// 保持寄存器（可读写 16 位字）
    HoldingRegister,
}

impl ChannelCategory {
    /// 构建请求时的类别遍历顺序。
    pub const ALL: [ChannelCategory; 4] = [
        ChannelCategory::Coil,
        ChannelCategory::DiscreteInput,
        ChannelCategory::InputRegister,
        ChannelCategory::HoldingRegister,
    ];

    /// 是否为位类型（线圈 / 离散输入）。
    pub fn is_discrete(self) -> bool {
        matches!(self, ChannelCategory::Coil | ChannelCategory::DiscreteInput)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChannelCategory::Coil => "coil",
            ChannelCategory::DiscreteInput => "discrete_input",
            ChannelCategory::InputRegister => "input_register",
            ChannelCategory::HoldingRegister => "holding_register",
        }
    }
}

impl fmt::Display for ChannelCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_order_is_stable() {
        let names: Vec<&str> = ChannelCategory::ALL.iter().map(|c| c.as_str()).collect();
        assert_eq!(
            names,
            vec!["coil", "discrete_input", "input_register", "holding_register"]
        );
    }

    #[test]
    fn discrete_categories() {
        assert!(ChannelCategory::Coil.is_discrete());
        assert!(ChannelCategory::DiscreteInput.is_discrete());
        assert!(!ChannelCategory::InputRegister.is_discrete());
        assert!(!ChannelCategory::HoldingRegister.is_discrete());
    }
}
