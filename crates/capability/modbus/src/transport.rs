//! 传输层抽象与设备链路

use crate::error::TransportError;
use crate::transaction::TransactionAllocator;
use crate::types::{ReadRequest, ReadResponse, DEFAULT_DEVICE_ID};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// 已连接的请求/响应传输
///
/// `send` 与 `receive` 会在读取周期的发送任务和接收任务中并发调用，
/// 实现需自行保证内部同步。连接建立与重连不属于此接口。
#[async_trait]
pub trait ModbusTransport: Send + Sync {
    /// 发送请求，不等待对应响应
    async fn send(&self, request: &ReadRequest) -> Result<(), TransportError>;

    /// 接收下一个响应（阻塞直到有响应）
    async fn receive(&self) -> Result<ReadResponse, TransportError>;

    /// 丢弃上一个周期遗留的未应答请求
    fn discard_pending(&self) {}
}

/// 一条设备链路：传输、设备锁、事务计数器与请求深度
///
/// 同一设备上的多个数据源共享同一条链路，设备锁保证同一时刻只有一个读取周期。
pub struct DeviceLink {
    name: String,
    transport: Arc<dyn ModbusTransport>,
    lock: Mutex<()>,
    transactions: TransactionAllocator,
    request_depth: u16,
    device_id: u8,
}

impl DeviceLink {
    pub fn new(
        name: impl Into<String>,
        transport: Arc<dyn ModbusTransport>,
        device_id: Option<u8>,
        request_depth: u16,
    ) -> Self {
        Self {
            name: name.into(),
            transport,
            lock: Mutex::new(()),
            transactions: TransactionAllocator::new(request_depth),
            request_depth,
            device_id: device_id.unwrap_or(DEFAULT_DEVICE_ID),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transport(&self) -> Arc<dyn ModbusTransport> {
        self.transport.clone()
    }

    pub fn transactions(&self) -> &TransactionAllocator {
        &self.transactions
    }

    /// 配置的请求深度（0 表示不使用事务关联）
    pub fn request_depth(&self) -> u16 {
        self.request_depth
    }

    /// 同时未应答请求的上限（至少为 1）
    pub fn request_slots(&self) -> usize {
        usize::from(self.request_depth.max(1))
    }

    pub fn device_id(&self) -> u8 {
        self.device_id
    }

    /// 获取设备锁，守卫释放即解锁
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }

    /// 设备锁当前是否被持有
    pub fn is_locked(&self) -> bool {
        self.lock.try_lock().is_err()
    }
}

impl std::fmt::Debug for DeviceLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceLink")
            .field("name", &self.name)
            .field("device_id", &self.device_id)
            .field("request_depth", &self.request_depth)
            .finish()
    }
}
