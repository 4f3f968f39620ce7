//! 事务 ID 分配

use crate::types::TransactionId;
use std::sync::Mutex;

/// 链路级事务 ID 计数器
///
/// 从 1 开始递增，到达 `u16::MAX` 后回绕到 1（0 保留给无事务关联的协议）。
/// 请求深度为 0 的链路不使用事务关联，`next` 始终返回 None。
#[derive(Debug)]
pub struct TransactionAllocator {
    counter: Mutex<TransactionId>,
    correlated: bool,
}

impl TransactionAllocator {
    pub fn new(request_depth: u16) -> Self {
        Self {
            counter: Mutex::new(0),
            correlated: request_depth > 0,
        }
    }

    pub fn is_correlated(&self) -> bool {
        self.correlated
    }

    pub fn next(&self) -> Option<TransactionId> {
        if !self.correlated {
            return None;
        }
        let mut counter = match self.counter.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *counter = if *counter == TransactionId::MAX {
            1
        } else {
            *counter + 1
        };
        Some(*counter)
    }
}
