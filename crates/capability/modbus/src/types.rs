//! Modbus 协议常量与请求/响应类型定义

use domain::ChannelCategory;

/// 远端设备中的地址（0x0000 ~ 0xFFFF）
pub type Address = u16;

/// 请求/响应关联用的事务 ID
pub type TransactionId = u16;

/// 单次读取线圈/离散输入的最大数量（Modbus Application Protocol V1.1b3）
pub const MAX_READ_COILS_INPUTS: u16 = 2000;

/// 单次读取寄存器的最大数量（Modbus Application Protocol V1.1b3）
pub const MAX_READ_REGISTERS: u16 = 125;

/// 未配置时使用的从站 ID
pub const DEFAULT_DEVICE_ID: u8 = 1;

/// 读线圈状态 (0x01)
pub const FUNCTION_CODE_READ_COILS: u8 = 0x01;
/// 读离散输入 (0x02)
pub const FUNCTION_CODE_READ_DISCRETE_INPUTS: u8 = 0x02;
/// 读保持寄存器 (0x03)
pub const FUNCTION_CODE_READ_HOLDING_REGISTERS: u8 = 0x03;
/// 读输入寄存器 (0x04)
pub const FUNCTION_CODE_READ_INPUT_REGISTERS: u8 = 0x04;

/// 类别对应的单次请求最大数量
pub fn max_burst(category: ChannelCategory) -> u16 {
    if category.is_discrete() {
        MAX_READ_COILS_INPUTS
    } else {
        MAX_READ_REGISTERS
    }
}

/// 类别对应的读功能码
pub fn function_code(category: ChannelCategory) -> u8 {
    match category {
        ChannelCategory::Coil => FUNCTION_CODE_READ_COILS,
        ChannelCategory::DiscreteInput => FUNCTION_CODE_READ_DISCRETE_INPUTS,
        ChannelCategory::InputRegister => FUNCTION_CODE_READ_INPUT_REGISTERS,
        ChannelCategory::HoldingRegister => FUNCTION_CODE_READ_HOLDING_REGISTERS,
    }
}

/// 读请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRequest {
    /// 数据类别（决定功能码）
    pub category: ChannelCategory,
    /// 起始地址
    pub address: Address,
    /// 读取数量
    pub quantity: u16,
    /// 从站 ID
    pub device_id: u8,
    /// 事务 ID；无事务关联的链路为 None
    pub transaction_id: Option<TransactionId>,
}

impl ReadRequest {
    pub fn function_code(&self) -> u8 {
        function_code(self.category)
    }
}

/// 响应数据（按请求地址顺序排列）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponsePayload {
    Coils(Vec<bool>),
    DiscreteInputs(Vec<bool>),
    InputRegisters(Vec<u16>),
    HoldingRegisters(Vec<u16>),
}

impl ResponsePayload {
    pub fn category(&self) -> ChannelCategory {
        match self {
            ResponsePayload::Coils(_) => ChannelCategory::Coil,
            ResponsePayload::DiscreteInputs(_) => ChannelCategory::DiscreteInput,
            ResponsePayload::InputRegisters(_) => ChannelCategory::InputRegister,
            ResponsePayload::HoldingRegisters(_) => ChannelCategory::HoldingRegister,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ResponsePayload::Coils(v) | ResponsePayload::DiscreteInputs(v) => v.len(),
            ResponsePayload::InputRegisters(v) | ResponsePayload::HoldingRegisters(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 构造空响应（用于异常响应）
    pub fn empty(category: ChannelCategory) -> Self {
        match category {
            ChannelCategory::Coil => ResponsePayload::Coils(Vec::new()),
            ChannelCategory::DiscreteInput => ResponsePayload::DiscreteInputs(Vec::new()),
            ChannelCategory::InputRegister => ResponsePayload::InputRegisters(Vec::new()),
            ChannelCategory::HoldingRegister => ResponsePayload::HoldingRegisters(Vec::new()),
        }
    }
}

/// 读响应
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadResponse {
    /// 事务 ID（与请求一致）
    pub transaction_id: Option<TransactionId>,
    /// 从站 ID
    pub device_id: u8,
    /// 设备返回的异常描述
    pub error: Option<String>,
    /// 响应数据
    pub payload: ResponsePayload,
}

impl ReadResponse {
    pub fn success(request: &ReadRequest, payload: ResponsePayload) -> Self {
        Self {
            transaction_id: request.transaction_id,
            device_id: request.device_id,
            error: None,
            payload,
        }
    }

    pub fn exception(request: &ReadRequest, error: impl Into<String>) -> Self {
        Self {
            transaction_id: request.transaction_id,
            device_id: request.device_id,
            error: Some(error.into()),
            payload: ResponsePayload::empty(request.category),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_burst_per_category() {
        assert_eq!(max_burst(ChannelCategory::Coil), 2000);
        assert_eq!(max_burst(ChannelCategory::DiscreteInput), 2000);
        assert_eq!(max_burst(ChannelCategory::InputRegister), 125);
        assert_eq!(max_burst(ChannelCategory::HoldingRegister), 125);
    }

    #[test]
    fn test_function_codes() {
        assert_eq!(function_code(ChannelCategory::Coil), 0x01);
        assert_eq!(function_code(ChannelCategory::DiscreteInput), 0x02);
        assert_eq!(function_code(ChannelCategory::HoldingRegister), 0x03);
        assert_eq!(function_code(ChannelCategory::InputRegister), 0x04);
    }

    #[test]
    fn test_exception_response_keeps_transaction() {
        let request = ReadRequest {
            category: ChannelCategory::HoldingRegister,
            address: 10,
            quantity: 2,
            device_id: 3,
            transaction_id: Some(42),
        };
        let response = ReadResponse::exception(&request, "illegal data address");
        assert_eq!(response.transaction_id, Some(42));
        assert_eq!(response.device_id, 3);
        assert_eq!(response.payload.category(), ChannelCategory::HoldingRegister);
        assert!(response.payload.is_empty());
    }
}
