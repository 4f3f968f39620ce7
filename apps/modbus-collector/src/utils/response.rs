//! HTTP 错误响应与值转换
//!
//! 读取错误与 HTTP 状态码的对应：
//! - SOURCE.NOT_FOUND -> 404
//! - READ.BUILD -> 500（通道定义无法构建请求）
//! - READ.PROTOCOL -> 502
//! - READ.TIMEOUT -> 504

use api_contract::ApiResponse;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use domain::ChannelValue;
use ems_modbus::{AdapterError, ReadError};
use serde_json::{Value, json};

fn error_response(status: StatusCode, code: &str, message: String) -> Response {
    (status, Json(ApiResponse::<()>::error(code, message))).into_response()
}

/// 读取错误响应
pub fn adapter_error(err: AdapterError) -> Response {
    let message = err.to_string();
    match err {
        AdapterError::UnknownSource(_) => {
            error_response(StatusCode::NOT_FOUND, "SOURCE.NOT_FOUND", message)
        }
        AdapterError::Read(ReadError::Build(_)) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "READ.BUILD", message)
        }
        AdapterError::Read(ReadError::Protocol(_)) => {
            error_response(StatusCode::BAD_GATEWAY, "READ.PROTOCOL", message)
        }
        AdapterError::Read(ReadError::Timeout(_)) => {
            error_response(StatusCode::GATEWAY_TIMEOUT, "READ.TIMEOUT", message)
        }
        AdapterError::Config(_) | AdapterError::Connection(_, _) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL.ERROR", message)
        }
    }
}

/// ChannelValue 转 JSON（数组通道输出数组）
pub fn channel_value_to_json(value: &ChannelValue) -> Value {
    match value {
        ChannelValue::Discrete(v) => json!(v),
        ChannelValue::Register(v) => json!(v),
        ChannelValue::DiscreteArray(v) => json!(v),
        ChannelValue::RegisterArray(v) => json!(v),
    }
}
