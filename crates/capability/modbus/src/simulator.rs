//! 内存模拟传输（仅用于本地测试和占位）
//!
//! 以内存中的线圈/寄存器表应答读请求，可注入响应延迟、停止应答、
//! 设备异常和无法关联的事务 ID，并记录同时未应答请求数的峰值。

use crate::error::TransportError;
use crate::transport::ModbusTransport;
use crate::types::{Address, ReadRequest, ReadResponse, ResponsePayload, TransactionId};
use async_trait::async_trait;
use domain::{ChannelCategory, RawValue};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Default)]
struct SimulatorState {
    banks: HashMap<(ChannelCategory, Address), RawValue>,
    pending: VecDeque<ReadRequest>,
    sent: Vec<ReadRequest>,
    responses: usize,
    outstanding: usize,
    max_outstanding: usize,
    exceptions: HashMap<ChannelCategory, String>,
    response_limits: HashMap<ChannelCategory, u16>,
    unexpected: VecDeque<TransactionId>,
    stall_after: Option<usize>,
    response_delay: Duration,
    reverse_order: bool,
}

#[derive(Default)]
pub struct SimulatedTransport {
    state: Mutex<SimulatorState>,
    queued: Notify,
}

impl SimulatedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, SimulatorState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn set_coil(&self, address: Address, value: bool) {
        self.state()
            .banks
            .insert((ChannelCategory::Coil, address), RawValue::Discrete(value));
    }

    pub fn set_discrete_input(&self, address: Address, value: bool) {
        self.state().banks.insert(
            (ChannelCategory::DiscreteInput, address),
            RawValue::Discrete(value),
        );
    }

    pub fn set_input_register(&self, address: Address, value: u16) {
        self.state().banks.insert(
            (ChannelCategory::InputRegister, address),
            RawValue::Register(value),
        );
    }

    pub fn set_holding_register(&self, address: Address, value: u16) {
        self.state().banks.insert(
            (ChannelCategory::HoldingRegister, address),
            RawValue::Register(value),
        );
    }

    /// 每个响应前等待的时间
    pub fn set_response_delay(&self, delay: Duration) {
        self.state().response_delay = delay;
    }

    /// 应答 `count` 个请求后不再应答
    pub fn stall_after(&self, count: usize) {
        self.state().stall_after = Some(count);
    }

    /// 该类别的请求返回设备异常
    pub fn fail_category(&self, category: ChannelCategory, error: impl Into<String>) {
        self.state().exceptions.insert(category, error.into());
    }

    /// 该类别的响应最多携带 `limit` 个值
    pub fn limit_response(&self, category: ChannelCategory, limit: u16) {
        self.state().response_limits.insert(category, limit);
    }

    /// 在下一个正常响应之前插入一个事务 ID 无法关联的响应
    pub fn inject_unexpected(&self, transaction_id: TransactionId) {
        self.state().unexpected.push_back(transaction_id);
    }

    /// 按后发先答的顺序应答
    pub fn respond_in_reverse(&self, reverse: bool) {
        self.state().reverse_order = reverse;
    }

    /// 已发送的全部请求
    pub fn sent_requests(&self) -> Vec<ReadRequest> {
        self.state().sent.clone()
    }

    /// 同时未应答请求数的峰值
    pub fn max_outstanding(&self) -> usize {
        self.state().max_outstanding
    }

    fn payload(state: &SimulatorState, request: &ReadRequest) -> ResponsePayload {
        let mut quantity = request.quantity;
        if let Some(limit) = state.response_limits.get(&request.category) {
            quantity = quantity.min(*limit);
        }
        let addresses = (0..quantity).filter_map(|offset| request.address.checked_add(offset));
        let lookup = |address: Address| state.banks.get(&(request.category, address)).copied();
        match request.category {
            ChannelCategory::Coil => ResponsePayload::Coils(
                addresses
                    .map(|a| lookup(a).and_then(|v| v.as_bool()).unwrap_or(false))
                    .collect(),
            ),
            ChannelCategory::DiscreteInput => ResponsePayload::DiscreteInputs(
                addresses
                    .map(|a| lookup(a).and_then(|v| v.as_bool()).unwrap_or(false))
                    .collect(),
            ),
            ChannelCategory::InputRegister => ResponsePayload::InputRegisters(
                addresses
                    .map(|a| lookup(a).and_then(|v| v.as_register()).unwrap_or(0))
                    .collect(),
            ),
            ChannelCategory::HoldingRegister => ResponsePayload::HoldingRegisters(
                addresses
                    .map(|a| lookup(a).and_then(|v| v.as_register()).unwrap_or(0))
                    .collect(),
            ),
        }
    }

    async fn next_request(&self) -> ReadRequest {
        loop {
            {
                let mut state = self.state();
                let request = if state.reverse_order {
                    state.pending.pop_back()
                } else {
                    state.pending.pop_front()
                };
                if let Some(request) = request {
                    return request;
                }
            }
            self.queued.notified().await;
        }
    }
}

#[async_trait]
impl ModbusTransport for SimulatedTransport {
    async fn send(&self, request: &ReadRequest) -> Result<(), TransportError> {
        {
            let mut state = self.state();
            state.pending.push_back(request.clone());
            state.sent.push(request.clone());
            state.outstanding += 1;
            state.max_outstanding = state.max_outstanding.max(state.outstanding);
        }
        self.queued.notify_one();
        Ok(())
    }

    async fn receive(&self) -> Result<ReadResponse, TransportError> {
        let (stalled, unexpected, delay) = {
            let mut state = self.state();
            let stalled = state
                .stall_after
                .is_some_and(|limit| state.responses >= limit);
            (stalled, state.unexpected.pop_front(), state.response_delay)
        };
        if let Some(transaction_id) = unexpected {
            return Ok(ReadResponse {
                transaction_id: Some(transaction_id),
                device_id: 0,
                error: None,
                payload: ResponsePayload::HoldingRegisters(vec![0xFFFF]),
            });
        }
        if stalled {
            std::future::pending::<()>().await;
        }

        let request = self.next_request().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        state.responses += 1;
        state.outstanding = state.outstanding.saturating_sub(1);
        let response = match state.exceptions.get(&request.category) {
            Some(error) => ReadResponse::exception(&request, error.clone()),
            None => ReadResponse::success(&request, Self::payload(&state, &request)),
        };
        Ok(response)
    }

    fn discard_pending(&self) {
        let mut state = self.state();
        state.pending.clear();
        state.outstanding = 0;
    }
}
