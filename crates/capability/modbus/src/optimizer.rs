//! 地址区间优化
//!
//! 把选中通道所需的地址按类别合并为尽量少的连续读取区间：
//! 相邻地址间隔不超过 `max_gap` 时合并到同一段，每段再按协议单次读取上限切分。
//! 关闭优化时每个通道原样生成一个区间（超出协议上限的请求由设备返回异常）。

use crate::catalog::{ChannelCatalog, ChannelSelection};
use crate::config::OptimizationConfig;
use crate::types::{max_burst, Address};
use domain::ChannelCategory;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// 连续地址区间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressRange {
    pub start: Address,
    pub count: u16,
}

impl AddressRange {
    pub fn new(start: Address, count: u16) -> Self {
        Self { start, count }
    }
}

/// 一次读取周期的区间计划（按类别顺序，再按区间顺序）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangePlan {
    ranges: Vec<(ChannelCategory, AddressRange)>,
}

impl RangePlan {
    pub fn ranges(&self) -> &[(ChannelCategory, AddressRange)] {
        &self.ranges
    }

    pub fn for_category(&self, category: ChannelCategory) -> Vec<AddressRange> {
        self.ranges
            .iter()
            .filter(|(c, _)| *c == category)
            .map(|(_, range)| *range)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

/// 将升序去重的地址序列合并为区间，并按 `max_burst` 切分
pub fn constrained_ranges(addresses: &[Address], max_gap: u16, max_burst: u16) -> Vec<AddressRange> {
    let mut ranges = Vec::new();
    let Some((&first, rest)) = addresses.split_first() else {
        return ranges;
    };

    let mut run_start = first;
    let mut run_last = first;
    for &address in rest {
        if u32::from(address) <= u32::from(run_last) + u32::from(max_gap) {
            run_last = address;
        } else {
            split_run(run_start, run_last, max_burst, &mut ranges);
            run_start = address;
            run_last = address;
        }
    }
    split_run(run_start, run_last, max_burst, &mut ranges);
    ranges
}

fn split_run(start: Address, last: Address, max_burst: u16, out: &mut Vec<AddressRange>) {
    let burst = u32::from(max_burst.max(1));
    let mut next = u32::from(start);
    let end = u32::from(last) + 1;
    while next < end {
        let count = (end - next).min(burst);
        out.push(AddressRange::new(next as Address, count as u16));
        next += count;
    }
}

/// 计算选中通道的区间计划
pub fn plan_ranges(
    catalog: &ChannelCatalog,
    selection: &ChannelSelection,
    optimization: &OptimizationConfig,
) -> RangePlan {
    let mut ranges = Vec::new();
    for category in ChannelCategory::ALL {
        if optimization.enabled {
            let addresses = catalog.addresses_for(category, selection);
            let merged = constrained_ranges(
                &addresses,
                optimization.max_gap(category),
                max_burst(category),
            );
            ranges.extend(merged.into_iter().map(|range| (category, range)));
        } else {
            ranges.extend(
                catalog
                    .channels_for(category, selection)
                    .map(|channel| (category, AddressRange::new(channel.address, channel.count))),
            );
        }
    }
    RangePlan { ranges }
}

/// 区间计划缓存：通道选择与上一次相同时复用上一次的计算结果
#[derive(Debug, Default)]
pub struct RangeCache {
    last: Mutex<Option<(ChannelSelection, Arc<RangePlan>)>>,
    computations: AtomicU64,
}

impl RangeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compute(
        &self,
        catalog: &ChannelCatalog,
        selection: &ChannelSelection,
        optimization: &OptimizationConfig,
    ) -> Arc<RangePlan> {
        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some((cached_selection, plan)) = last.as_ref() {
            if cached_selection == selection {
                return plan.clone();
            }
        }
        let plan = Arc::new(plan_ranges(catalog, selection, optimization));
        self.computations.fetch_add(1, Ordering::Relaxed);
        *last = Some((selection.clone(), plan.clone()));
        plan
    }

    /// 实际执行优化计算的次数
    pub fn computations(&self) -> u64 {
        self.computations.load(Ordering::Relaxed)
    }
}
