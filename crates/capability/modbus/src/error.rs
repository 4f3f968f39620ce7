//! Modbus 读取引擎错误类型定义

/// 单次读取周期的失败结果（`read_values` 的唯一错误出口）
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReadError {
    /// 设备返回异常码、传输失败或读取任务异常退出
    #[error("protocol error: {0}")]
    Protocol(String),

    /// 读取超时时间内未收到全部响应
    #[error("timeout reading from source \"{0}\"")]
    Timeout(String),

    /// 构建请求时发现的通道配置问题
    #[error("build error: {0}")]
    Build(String),
}

/// 传输层错误
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// IO 错误
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Modbus 客户端错误
    #[error("modbus error: {0}")]
    Modbus(String),

    /// 通道关闭
    #[error("transport closed")]
    Closed,
}

/// 采集配置错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 配置解析错误
    #[error("config parse error: {0}")]
    Parse(String),

    /// 配置校验失败：(配置项, 原因)
    #[error("invalid config {0}: {1}")]
    Invalid(String, String),
}

/// 适配器层错误（按数据源路由读取）
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("unknown source {0}")]
    UnknownSource(String),

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// 连接设备失败：(设备, 原因)
    #[error("connection error for device {0}: {1}")]
    Connection(String, String),
}
