//! 基于 tokio-modbus 的 Modbus TCP 传输
//!
//! `send` 只把请求放入待执行队列，`receive` 取出队首请求在客户端上下文中执行，
//! 并把请求的事务 ID 写回响应，使其可以接入流水线读取周期。
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! let transport = TokioModbusTransport::connect("192.168.1.100", 502, 1, Duration::from_secs(5)).await?;
//! let link = DeviceLink::new("plc-1", Arc::new(transport), Some(1), 1);
//! ```

use crate::error::TransportError;
use crate::transport::ModbusTransport;
use crate::types::{ReadRequest, ReadResponse, ResponsePayload};
use async_trait::async_trait;
use domain::ChannelCategory;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Mutex as StdMutex;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio_modbus::prelude::*;
use tracing::{debug, info};

/// tokio-modbus 客户端上的传输
///
/// 限制：读取超时会在 `ctx.read_*` 执行中途取消接收任务，此时请求已发出但其响应未被读取，
/// `discard_pending` 只清空本地队列，无法丢弃连接上残留的响应帧。下一次调用可能读到该帧，
/// 由 tokio-modbus 的事务头校验报错并以协议错误结束该周期。需要干净连接时应重新 `connect`。
pub struct TokioModbusTransport {
    addr: SocketAddr,
    ctx: Mutex<tokio_modbus::client::Context>,
    queue: StdMutex<VecDeque<ReadRequest>>,
    queued: Notify,
}

impl TokioModbusTransport {
    /// 连接 Modbus TCP 服务器
    pub async fn connect(
        host: &str,
        port: u16,
        device_id: u8,
        connect_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let addr = tokio::net::lookup_host((host, port))
            .await?
            .next()
            .ok_or_else(|| TransportError::Modbus(format!("no address for {}:{}", host, port)))?;

        info!(target: "ems.modbus", %addr, "connecting_modbus_server");

        let ctx = tokio::time::timeout(connect_timeout, tcp::connect_slave(addr, Slave(device_id)))
            .await
            .map_err(|_| {
                TransportError::Modbus(format!(
                    "connect to {} timed out after {} ms",
                    addr,
                    connect_timeout.as_millis()
                ))
            })??;

        info!(target: "ems.modbus", %addr, "modbus_server_connected");

        Ok(Self {
            addr,
            ctx: Mutex::new(ctx),
            queue: StdMutex::new(VecDeque::new()),
            queued: Notify::new(),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn queue(&self) -> std::sync::MutexGuard<'_, VecDeque<ReadRequest>> {
        match self.queue.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    async fn next_request(&self) -> ReadRequest {
        loop {
            if let Some(request) = self.queue().pop_front() {
                return request;
            }
            self.queued.notified().await;
        }
    }

    async fn execute(
        ctx: &mut tokio_modbus::client::Context,
        request: &ReadRequest,
    ) -> Result<ReadResponse, TransportError> {
        ctx.set_slave(Slave(request.device_id));

        let address = request.address;
        let quantity = request.quantity;
        let result = match request.category {
            ChannelCategory::Coil => ctx
                .read_coils(address, quantity)
                .await
                .map_err(|e| TransportError::Modbus(e.to_string()))?
                .map(ResponsePayload::Coils),
            ChannelCategory::DiscreteInput => ctx
                .read_discrete_inputs(address, quantity)
                .await
                .map_err(|e| TransportError::Modbus(e.to_string()))?
                .map(ResponsePayload::DiscreteInputs),
            ChannelCategory::InputRegister => ctx
                .read_input_registers(address, quantity)
                .await
                .map_err(|e| TransportError::Modbus(e.to_string()))?
                .map(ResponsePayload::InputRegisters),
            ChannelCategory::HoldingRegister => ctx
                .read_holding_registers(address, quantity)
                .await
                .map_err(|e| TransportError::Modbus(e.to_string()))?
                .map(ResponsePayload::HoldingRegisters),
        };

        Ok(match result {
            Ok(payload) => ReadResponse::success(request, payload),
            Err(exception) => ReadResponse::exception(request, format!("exception: {:?}", exception)),
        })
    }
}

#[async_trait]
impl ModbusTransport for TokioModbusTransport {
    async fn send(&self, request: &ReadRequest) -> Result<(), TransportError> {
        self.queue().push_back(request.clone());
        self.queued.notify_one();
        Ok(())
    }

    /// 执行队首请求；在执行中途被取消时，连接上可能残留一个未读响应（见类型说明）
    async fn receive(&self) -> Result<ReadResponse, TransportError> {
        let request = self.next_request().await;
        let mut ctx = self.ctx.lock().await;
        let response = Self::execute(&mut ctx, &request).await?;

        debug!(
            target: "ems.modbus",
            addr = %self.addr,
            category = %request.category,
            address = request.address,
            quantity = request.quantity,
            transaction_id = ?request.transaction_id,
            error = ?response.error,
            "modbus_request_executed"
        );

        Ok(response)
    }

    fn discard_pending(&self) {
        self.queue().clear();
    }
}
