//! 稳定的 DTO 与 API 响应契约。

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// 标准 API 响应封装。
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

/// 失败响应的错误体。
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

/// 数据源概要。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDto {
    pub source_id: String,
    pub name: String,
    pub device: String,
    pub channels: Vec<String>,
}

/// 一次读取得到的通道值。
///
/// 单地址通道为数字或布尔值，多地址通道为数组。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceValuesDto {
    pub source_id: String,
    pub values: BTreeMap<String, Value>,
    pub read_at_ms: i64,
    pub duration_ms: u64,
}

/// 读取指标。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsDto {
    pub reads: u64,
    pub read_success: u64,
    pub read_errors: u64,
    pub read_timeouts: u64,
    pub values_read: u64,
    pub read_duration_ms_avg: u64,
    pub unexpected_responses: u64,
}
