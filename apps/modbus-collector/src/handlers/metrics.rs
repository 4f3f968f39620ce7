//! 读取指标快照。
//!
//! - GET /metrics

use api_contract::{ApiResponse, MetricsDto};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ems_telemetry::metrics;

pub async fn get_metrics() -> Response {
    let snapshot = metrics().snapshot();
    (
        StatusCode::OK,
        Json(ApiResponse::success(MetricsDto {
            reads: snapshot.reads,
            read_success: snapshot.read_success,
            read_errors: snapshot.read_errors,
            read_timeouts: snapshot.read_timeouts,
            values_read: snapshot.values_read,
            read_duration_ms_avg: snapshot.average_read_duration_ms(),
            unexpected_responses: snapshot.unexpected_responses,
        })),
    )
        .into_response()
}
