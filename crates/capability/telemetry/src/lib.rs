//! 追踪、请求 ID 生成与读取指标。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 请求级追踪标识。
#[derive(Debug, Clone)]
pub struct RequestIds {
    pub request_id: String,
    pub trace_id: String,
}

/// 读取指标快照。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub reads: u64,
    pub read_success: u64,
    pub read_errors: u64,
    pub read_timeouts: u64,
    pub values_read: u64,
    pub read_duration_ms_total: u64,
    pub read_duration_ms_count: u64,
    pub unexpected_responses: u64,
}

impl MetricsSnapshot {
    /// 平均读取耗时（毫秒），无样本时为 0。
    pub fn average_read_duration_ms(&self) -> u64 {
        if self.read_duration_ms_count == 0 {
            0
        } else {
            self.read_duration_ms_total / self.read_duration_ms_count
        }
    }
}

/// 读取指标。
pub struct TelemetryMetrics {
    reads: AtomicU64,
    read_success: AtomicU64,
    read_errors: AtomicU64,
    read_timeouts: AtomicU64,
    values_read: AtomicU64,
    read_duration_ms_total: AtomicU64,
    read_duration_ms_count: AtomicU64,
    unexpected_responses: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            reads: AtomicU64::new(0),
            read_success: AtomicU64::new(0),
            read_errors: AtomicU64::new(0),
            read_timeouts: AtomicU64::new(0),
            values_read: AtomicU64::new(0),
            read_duration_ms_total: AtomicU64::new(0),
            read_duration_ms_count: AtomicU64::new(0),
            unexpected_responses: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            reads: self.reads.load(Ordering::Relaxed),
            read_success: self.read_success.load(Ordering::Relaxed),
            read_errors: self.read_errors.load(Ordering::Relaxed),
            read_timeouts: self.read_timeouts.load(Ordering::Relaxed),
            values_read: self.values_read.load(Ordering::Relaxed),
            read_duration_ms_total: self.read_duration_ms_total.load(Ordering::Relaxed),
            read_duration_ms_count: self.read_duration_ms_count.load(Ordering::Relaxed),
            unexpected_responses: self.unexpected_responses.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 request_id 与 trace_id。
pub fn new_request_ids() -> RequestIds {
    RequestIds {
        request_id: uuid::Uuid::new_v4().to_string(),
        trace_id: uuid::Uuid::new_v4().to_string(),
    }
}

/// 记录数据源读取次数。
pub fn record_read() {
    metrics().reads.fetch_add(1, Ordering::Relaxed);
}

/// 记录读取成功次数与读到的通道值数量。
pub fn record_read_success(values: u64) {
    let metrics = metrics();
    metrics.read_success.fetch_add(1, Ordering::Relaxed);
    metrics.values_read.fetch_add(values, Ordering::Relaxed);
}

/// 记录读取失败次数（含超时）。
pub fn record_read_error() {
    metrics().read_errors.fetch_add(1, Ordering::Relaxed);
}

/// 记录读取超时次数。
pub fn record_read_timeout() {
    metrics().read_timeouts.fetch_add(1, Ordering::Relaxed);
}

/// 记录读取耗时（毫秒）。
pub fn record_read_duration_ms(duration_ms: u64) {
    let metrics = metrics();
    metrics
        .read_duration_ms_total
        .fetch_add(duration_ms, Ordering::Relaxed);
    metrics
        .read_duration_ms_count
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录事务 ID 无法关联而被丢弃的响应。
pub fn record_unexpected_response() {
    metrics()
        .unexpected_responses
        .fetch_add(1, Ordering::Relaxed);
}
