//! 流水线读取周期
//!
//! 发送、接收、超时三个任务并发运行：
//! - 发送任务按构建顺序发送请求，每个请求先占用一个请求槽，槽位耗尽时等待；
//! - 接收任务按事务 ID 关联响应并累积数据，每关联一个响应释放一个槽位；
//! - 超时任务在读取超时后提交超时结果。
//!
//! 第一个提交的结果即为周期结果，其余任务随即取消。调用方需持有设备锁。

use crate::assembler::ResponseAccumulator;
use crate::error::ReadError;
use crate::transport::{DeviceLink, ModbusTransport};
use crate::types::{ReadRequest, ReadResponse, TransactionId};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, trace, warn};

type CycleOutcome = Result<ResponseAccumulator, ReadError>;

/// 待应答请求的关联方式
enum PendingRequests {
    /// 按事务 ID 关联（响应顺序任意）
    Correlated(HashMap<TransactionId, ReadRequest>),
    /// 无事务 ID，按发送顺序依次对应
    Sequential(VecDeque<ReadRequest>),
}

impl PendingRequests {
    fn new(requests: &[ReadRequest], correlated: bool) -> Self {
        if correlated {
            PendingRequests::Correlated(
                requests
                    .iter()
                    .filter_map(|r| r.transaction_id.map(|id| (id, r.clone())))
                    .collect(),
            )
        } else {
            PendingRequests::Sequential(requests.iter().cloned().collect())
        }
    }

    /// 取出响应对应的请求；无法关联时返回 None
    fn take(&mut self, response: &ReadResponse) -> Option<ReadRequest> {
        match self {
            PendingRequests::Correlated(pending) => {
                response.transaction_id.and_then(|id| pending.remove(&id))
            }
            PendingRequests::Sequential(pending) => pending.pop_front(),
        }
    }
}

/// 执行一次读取周期
pub async fn run_cycle(
    source_id: &str,
    link: &DeviceLink,
    requests: Vec<ReadRequest>,
    read_timeout: Duration,
) -> CycleOutcome {
    if requests.is_empty() {
        return Ok(ResponseAccumulator::new());
    }

    let transport = link.transport();
    transport.discard_pending();

    let expected = requests.len();
    let correlated = link.transactions().is_correlated();
    let slots = Arc::new(Semaphore::new(link.request_slots()));
    let (outcome_tx, mut outcome_rx) = mpsc::channel::<CycleOutcome>(3);
    let mut tasks = JoinSet::new();

    let pending = PendingRequests::new(&requests, correlated);

    tasks.spawn(send_requests(
        transport.clone(),
        requests,
        slots.clone(),
        outcome_tx.clone(),
    ));
    tasks.spawn(receive_responses(
        source_id.to_string(),
        transport,
        pending,
        expected,
        slots,
        outcome_tx.clone(),
    ));
    tasks.spawn(watch_timeout(
        source_id.to_string(),
        read_timeout,
        outcome_tx,
    ));

    let outcome = loop {
        tokio::select! {
            Some(outcome) = outcome_rx.recv() => break outcome,
            Some(joined) = tasks.join_next() => {
                if let Err(e) = joined {
                    if e.is_panic() {
                        break Err(ReadError::Protocol(format!("read task failed: {}", e)));
                    }
                }
            }
            else => break Err(ReadError::Protocol("read cycle ended without a result".to_string())),
        }
    };

    tasks.shutdown().await;
    outcome
}

async fn send_requests(
    transport: Arc<dyn ModbusTransport>,
    requests: Vec<ReadRequest>,
    slots: Arc<Semaphore>,
    outcome_tx: mpsc::Sender<CycleOutcome>,
) {
    for request in requests {
        let Ok(permit) = slots.acquire().await else {
            return;
        };
        permit.forget();
        trace!(target: "ems.modbus", available = slots.available_permits(), "request_slot_acquired");

        if let Err(e) = transport.send(&request).await {
            let _ = outcome_tx
                .send(Err(ReadError::Protocol(format!(
                    "failed to send {} request at address {}: {}",
                    request.category, request.address, e
                ))))
                .await;
            return;
        }
        debug!(
            target: "ems.modbus",
            category = %request.category,
            address = request.address,
            quantity = request.quantity,
            transaction_id = ?request.transaction_id,
            "request_sent"
        );
    }
}

async fn receive_responses(
    source_id: String,
    transport: Arc<dyn ModbusTransport>,
    mut pending: PendingRequests,
    expected: usize,
    slots: Arc<Semaphore>,
    outcome_tx: mpsc::Sender<CycleOutcome>,
) {
    let mut accumulator = ResponseAccumulator::new();
    let mut received = 0usize;

    while received < expected {
        let response = match transport.receive().await {
            Ok(response) => response,
            Err(e) => {
                let _ = outcome_tx
                    .send(Err(ReadError::Protocol(format!("failed to receive response: {}", e))))
                    .await;
                return;
            }
        };

        let Some(request) = pending.take(&response) else {
            warn!(
                target: "ems.modbus",
                source_id = %source_id,
                transaction_id = ?response.transaction_id,
                "unexpected_transaction"
            );
            ems_telemetry::record_unexpected_response();
            continue;
        };

        if let Some(error) = response.error {
            let _ = outcome_tx
                .send(Err(ReadError::Protocol(format!(
                    "{} request at address {} (quantity {}) failed: {}",
                    request.category, request.address, request.quantity, error
                ))))
                .await;
            return;
        }

        if let Err(e) = accumulator.merge(&request, response.payload) {
            let _ = outcome_tx.send(Err(e)).await;
            return;
        }

        received += 1;
        slots.add_permits(1);
        trace!(
            target: "ems.modbus",
            transaction_id = ?request.transaction_id,
            received,
            expected,
            "response_received"
        );
    }

    let _ = outcome_tx.send(Ok(accumulator)).await;
}

async fn watch_timeout(
    source_id: String,
    read_timeout: Duration,
    outcome_tx: mpsc::Sender<CycleOutcome>,
) {
    tokio::time::sleep(read_timeout).await;
    warn!(
        target: "ems.modbus",
        source_id = %source_id,
        timeout_ms = read_timeout.as_millis() as u64,
        "read_cycle_timeout"
    );
    let _ = outcome_tx.send(Err(ReadError::Timeout(source_id))).await;
}
