//! 轮询任务
//!
//! 按固定间隔依次读取全部数据源。读取失败只记录日志，不中断轮询。

use ems_modbus::ModbusAdapter;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

/// 启动轮询任务
pub fn spawn_poll(adapter: Arc<ModbusAdapter>, poll_interval: Duration) -> tokio::task::JoinHandle<()> {
    info!(
        target: "ems.collector",
        interval_ms = poll_interval.as_millis() as u64,
        "poll_started"
    );
    tokio::spawn(async move {
        let mut ticker = interval(poll_interval);
        // 单轮读取超过间隔时不补发
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            poll_once(&adapter).await;
        }
    })
}

/// 读取一轮全部数据源，返回成功的数据源数量
pub async fn poll_once(adapter: &ModbusAdapter) -> usize {
    let mut succeeded = 0;
    for source_id in adapter.source_ids() {
        // 失败已由 adapter 记录指标与日志
        if let Ok(values) = adapter.read(source_id, None).await {
            succeeded += 1;
            debug!(
                target: "ems.collector",
                source_id = %source_id,
                values = ?values,
                "source_polled"
            );
        }
    }
    succeeded
}
