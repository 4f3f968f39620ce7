/// 单个地址上读到的原始值。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawValue {
    /// 线圈 / 离散输入的状态
    Discrete(bool),
    /// 输入寄存器 / 保持寄存器的 16 位值
    Register(u16),
}

impl RawValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RawValue::Discrete(v) => Some(*v),
            RawValue::Register(_) => None,
        }
    }

    pub fn as_register(&self) -> Option<u16> {
        match self {
            RawValue::Register(v) => Some(*v),
            RawValue::Discrete(_) => None,
        }
    }
}

/// 通道读取结果（单值或按地址顺序排列的数组）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelValue {
    Discrete(bool),
    Register(u16),
    DiscreteArray(Vec<bool>),
    RegisterArray(Vec<u16>),
}

impl ChannelValue {
    /// 数组通道的元素个数，单值为 1。
    pub fn len(&self) -> usize {
        match self {
            ChannelValue::Discrete(_) | ChannelValue::Register(_) => 1,
            ChannelValue::DiscreteArray(values) => values.len(),
            ChannelValue::RegisterArray(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<RawValue> for ChannelValue {
    fn from(value: RawValue) -> Self {
        match value {
            RawValue::Discrete(v) => ChannelValue::Discrete(v),
            RawValue::Register(v) => ChannelValue::Register(v),
        }
    }
}
