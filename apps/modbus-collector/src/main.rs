//! Modbus 采集服务：周期轮询数据源，并通过 HTTP 提供按需读取与指标查询。

mod handlers;
mod poll;
mod routes;
mod utils;

use axum::{
    Router,
    body::Body,
    http::{HeaderValue, Request},
    middleware::{self, Next},
    response::Response,
};
use ems_config::AppConfig;
use ems_modbus::{ModbusAdapter, ModbusCollectorConfig};
use ems_telemetry::{init_tracing, new_request_ids};
use std::sync::Arc;
use tracing::{Instrument, info};

#[derive(Clone)]
pub struct AppState {
    /// 数据源读取入口
    pub adapter: Arc<ModbusAdapter>,
    /// 采集配置（用于数据源列表）
    pub collector: Arc<ModbusCollectorConfig>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = AppConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();

    // 加载并校验采集配置
    let raw = std::fs::read_to_string(&config.modbus_config_path)?;
    let collector = Arc::new(ModbusCollectorConfig::from_json(&raw)?);
    info!(
        target: "ems.collector",
        path = %config.modbus_config_path.display(),
        devices = collector.devices.len(),
        sources = collector.sources.len(),
        "collector_config_loaded"
    );

    // 每个设备一条 Modbus TCP 链路
    let adapter = Arc::new(ModbusAdapter::connect(&collector).await?);

    if config.poll_enabled {
        poll::spawn_poll(adapter.clone(), config.poll_interval());
    } else {
        info!(target: "ems.collector", "poll disabled (EMS_POLL_ENABLED=off)");
    }

    let state = AppState { adapter, collector };
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    info!(target: "ems.collector", addr = %config.http_addr, "http_listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// 组装全部路由（同时支持 / 与 /api/ 前缀）
fn build_app(state: AppState) -> Router {
    let api = routes::create_api_router();
    Router::new()
        .merge(api.clone())
        .nest("/api", api)
        .with_state(state)
        // 注入 request_id/trace_id
        .layer(middleware::from_fn(request_context))
}

async fn request_context(mut req: Request<Body>, next: Next) -> Response {
    // 生成 request_id 与 trace_id，并注入请求扩展与日志
    let ids = new_request_ids();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    req.extensions_mut().insert(ids.clone());

    let span = tracing::info_span!(
        "request",
        request_id = %ids.request_id,
        trace_id = %ids.trace_id,
        method = %method,
        path = %path
    );

    let mut response = next.run(req).instrument(span).await;
    response.headers_mut().insert(
        "x-request-id",
        HeaderValue::from_str(&ids.request_id).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    response.headers_mut().insert(
        "x-trace-id",
        HeaderValue::from_str(&ids.trace_id).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use ems_modbus::{DeviceLink, SimulatedTransport};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use tower::ServiceExt;

    const CONFIG: &str = r##"{
        "devices": { "plc-1": { "host": "127.0.0.1", "request_depth": 2 } },
        "sources": {
            "meter-1": {
                "name": "Main meter",
                "adapter_device": "plc-1",
                "read_timeout_ms": 200,
                "channels": {
                    "running": { "type": "coil", "address": 0 },
                    "energy": { "type": "holding_register", "address": 200, "size": 2 }
                }
            },
            "meter-2": {
                "adapter_device": "plc-1",
                "read_timeout_ms": 200,
                "channels": { "temperature": { "type": "input_register", "address": 100 } }
            }
        }
    }"##;

    fn test_app(transport: Arc<SimulatedTransport>) -> Router {
        let collector = ModbusCollectorConfig::from_json(CONFIG).expect("config");
        let link = Arc::new(DeviceLink::new("plc-1", transport, None, 2));
        let links = HashMap::from([("plc-1".to_string(), link)]);
        let adapter = ModbusAdapter::with_links(&collector, links).expect("adapter");
        build_app(AppState {
            adapter: Arc::new(adapter),
            collector: Arc::new(collector),
        })
    }

    fn simulated() -> Arc<SimulatedTransport> {
        let transport = Arc::new(SimulatedTransport::new());
        transport.set_coil(0, true);
        transport.set_holding_register(200, 12);
        transport.set_holding_register(201, 34);
        transport.set_input_register(100, 215);
        transport
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Value, HeaderMap) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let value: Value = serde_json::from_slice(&bytes).expect("json");
        (status, value, headers)
    }

    #[tokio::test]
    async fn health_has_request_ids() {
        let (status, body, headers) = get(test_app(simulated()), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true }));
        assert!(headers.contains_key("x-request-id"));
        assert!(headers.contains_key("x-trace-id"));
    }

    #[tokio::test]
    async fn read_all_channels() {
        let (status, body, _) = get(test_app(simulated()), "/api/sources/meter-1/values").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["sourceId"], "meter-1");
        assert_eq!(body["data"]["values"]["running"], json!(true));
        assert_eq!(body["data"]["values"]["energy"], json!([12, 34]));
    }

    #[tokio::test]
    async fn read_selected_channels() {
        let (status, body, _) = get(
            test_app(simulated()),
            "/sources/meter-1/values?channels=energy",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let values = body["data"]["values"].as_object().expect("values");
        assert_eq!(values.len(), 1);
        assert_eq!(values["energy"], json!([12, 34]));
    }

    #[tokio::test]
    async fn unknown_source_is_not_found() {
        let (status, body, _) = get(test_app(simulated()), "/api/sources/meter-9/values").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "SOURCE.NOT_FOUND");
    }

    #[tokio::test]
    async fn unknown_channel_is_skipped() {
        let (status, body, _) = get(
            test_app(simulated()),
            "/api/sources/meter-1/values?channels=energy,bogus",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let values = body["data"]["values"].as_object().expect("values");
        assert_eq!(values.len(), 1);
        assert_eq!(values["energy"], json!([12, 34]));
    }

    #[tokio::test]
    async fn device_exception_is_bad_gateway() {
        let transport = simulated();
        transport.fail_category(domain::ChannelCategory::InputRegister, "illegal data address");
        let (status, body, _) = get(test_app(transport), "/api/sources/meter-2/values").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["code"], "READ.PROTOCOL");
    }

    #[tokio::test]
    async fn stalled_device_is_gateway_timeout() {
        let transport = simulated();
        transport.stall_after(0);
        let (status, body, _) = get(test_app(transport), "/api/sources/meter-2/values").await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["error"]["code"], "READ.TIMEOUT");
    }

    #[tokio::test]
    async fn list_sources() {
        let (status, body, _) = get(test_app(simulated()), "/api/sources").await;
        assert_eq!(status, StatusCode::OK);
        let sources = body["data"].as_array().expect("sources");
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0]["sourceId"], "meter-1");
        assert_eq!(sources[0]["name"], "Main meter");
        assert_eq!(sources[0]["device"], "plc-1");
        assert_eq!(sources[0]["channels"], json!(["energy", "running"]));
        assert_eq!(sources[1]["name"], "meter-2");
    }

    #[tokio::test]
    async fn metrics_count_reads() {
        let app = test_app(simulated());
        let (status, _, _) = get(app.clone(), "/api/sources/meter-1/values").await;
        assert_eq!(status, StatusCode::OK);
        let (status, body, _) = get(app, "/api/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"]["reads"].as_u64().expect("reads") >= 1);
        assert!(body["data"]["readSuccess"].as_u64().expect("success") >= 1);
    }
}
