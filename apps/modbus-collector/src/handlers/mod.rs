//! Handlers 模块

pub mod metrics;
pub mod sources;

pub use metrics::*;
pub use sources::*;

use axum::{Json, response::IntoResponse};

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}
