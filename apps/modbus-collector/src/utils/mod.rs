//! 工具函数

pub mod response;

/// 解析逗号分隔的通道列表；缺省或为空时返回 None（读取全部通道）
pub fn parse_channel_list(raw: Option<&str>) -> Option<Vec<String>> {
    let channels: Vec<String> = raw?
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();
    if channels.is_empty() {
        None
    } else {
        Some(channels)
    }
}

/// 获取当前 Unix 时间戳（毫秒）
pub fn now_epoch_ms() -> i64 {
    let now = std::time::SystemTime::now();
    let duration = now
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    duration.as_millis() as i64
}
