//! 数据源 handlers
//!
//! - GET /sources
//! - GET /sources/{id}/values?channels=a,b

use crate::AppState;
use crate::utils::response::{adapter_error, channel_value_to_json};
use crate::utils::{now_epoch_ms, parse_channel_list};
use api_contract::{ApiResponse, SourceDto, SourceValuesDto};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::collections::BTreeMap;
use std::time::Instant;

#[derive(serde::Deserialize)]
pub struct SourcePath {
    pub(crate) source_id: String,
}

#[derive(serde::Deserialize)]
pub struct ValuesQuery {
    /// 逗号分隔的通道 ID，缺省读取全部通道
    pub channels: Option<String>,
}

pub async fn list_sources(State(state): State<AppState>) -> Response {
    let data: Vec<SourceDto> = state
        .collector
        .sources
        .iter()
        .map(|(source_id, source)| SourceDto {
            source_id: source_id.clone(),
            name: source.name.clone().unwrap_or_else(|| source_id.clone()),
            device: source.adapter_device.clone(),
            channels: source.enabled_channels().map(|(id, _)| id.clone()).collect(),
        })
        .collect();
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}

pub async fn read_source_values(
    State(state): State<AppState>,
    Path(path): Path<SourcePath>,
    Query(query): Query<ValuesQuery>,
) -> Response {
    let channels = parse_channel_list(query.channels.as_deref());
    let started = Instant::now();
    let values = match state
        .adapter
        .read(&path.source_id, channels.as_deref())
        .await
    {
        Ok(values) => values,
        Err(err) => return adapter_error(err),
    };
    let data = SourceValuesDto {
        source_id: path.source_id,
        values: values
            .iter()
            .map(|(id, value)| (id.clone(), channel_value_to_json(value)))
            .collect::<BTreeMap<_, _>>(),
        read_at_ms: now_epoch_ms(),
        duration_ms: started.elapsed().as_millis() as u64,
    };
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}
