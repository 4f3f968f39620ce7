//! 路由定义
//!
//! - 健康检查：/health
//! - 数据源：/sources, /sources/{id}/values
//! - 指标：/metrics

use super::AppState;
use super::handlers::*;
use axum::{Router, routing::get};

/// 创建 API 路由
///
/// 返回包含所有 API 端点的 Router，支持 / 和 /api/ 两种前缀
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/sources", get(list_sources))
        .route("/sources/:source_id/values", get(read_source_values))
        .route("/metrics", get(get_metrics))
}
