//! 读请求构建

use crate::optimizer::RangePlan;
use crate::transaction::TransactionAllocator;
use crate::types::ReadRequest;

/// 按区间计划构建本周期的全部请求（顺序即发送顺序）
///
/// 每个请求消耗一个新的事务 ID，同一周期内的 ID 不会重复。
pub fn build_requests(
    plan: &RangePlan,
    device_id: u8,
    allocator: &TransactionAllocator,
) -> Vec<ReadRequest> {
    plan.ranges()
        .iter()
        .map(|(category, range)| ReadRequest {
            category: *category,
            address: range.start,
            quantity: range.count,
            device_id,
            transaction_id: allocator.next(),
        })
        .collect()
}
