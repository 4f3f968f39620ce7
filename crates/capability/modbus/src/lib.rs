//! # Modbus 读取引擎
//!
//! 把配置好的通道转换为最少的读请求，在共享设备链路上以有限深度流水线发送，
//! 按事务 ID 关联响应，并在读取超时内组装出每个通道的值。
//!
//! ## 数据流
//!
//! ```text
//! ChannelCatalog -> optimizer -> build_requests -> run_cycle <-> ModbusTransport -> assemble
//! ```
//!
//! ## 模块说明
//!
//! - `config`: 采集配置模型（设备、数据源、通道、优化选项）
//! - `catalog`: 通道目录
//! - `optimizer`: 地址区间合并与切分，区间计划缓存
//! - `transaction`: 事务 ID 分配
//! - `request`: 读请求构建
//! - `cycle`: 流水线读取周期（发送/接收/超时）
//! - `assembler`: 结果组装
//! - `transport`: 传输接口与设备链路
//! - `tcp`: 基于 tokio-modbus 的 TCP 传输
//! - `simulator`: 内存模拟传输
//! - `device` / `adapter`: 数据源读取入口与按名称路由

pub mod adapter;
pub mod assembler;
pub mod catalog;
pub mod config;
pub mod cycle;
pub mod device;
pub mod error;
pub mod optimizer;
pub mod request;
pub mod simulator;
pub mod tcp;
pub mod transaction;
pub mod transport;
pub mod types;

pub use adapter::ModbusAdapter;
pub use assembler::{assemble, ResponseAccumulator};
pub use catalog::{ChannelCatalog, ChannelDefinition, ChannelSelection};
pub use config::{
    ModbusChannelConfig, ModbusChannelType, ModbusCollectorConfig, ModbusDeviceConfig,
    ModbusSourceConfig, OptimizationConfig,
};
pub use device::ModbusDevice;
pub use error::{AdapterError, ConfigError, ReadError, TransportError};
pub use optimizer::{constrained_ranges, plan_ranges, AddressRange, RangeCache, RangePlan};
pub use simulator::SimulatedTransport;
pub use tcp::TokioModbusTransport;
pub use transaction::TransactionAllocator;
pub use transport::{DeviceLink, ModbusTransport};
pub use types::{ReadRequest, ReadResponse, ResponsePayload};
