//! Fronius Gen24 采集守护进程：HTTP 装配与进程生命周期。

mod handlers;
mod routes;
mod state;
mod utils;

use axum::{
    body::Body,
    http::{HeaderValue, Request},
    middleware::{self, Next},
    response::Response,
};
use fronius_collector::{Collector, CollectorOptions};
use fronius_config::AppConfig;
use fronius_push::PushClient;
use fronius_telemetry::{init_tracing, new_request_ids};
use state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();

    // 进程级单例：推送客户端与采集器
    let push = Arc::new(PushClient::from_values(
        config.liveone_api_key.clone(),
        config.liveone_server.clone(),
        config.liveone_enabled.clone(),
    ));
    let collector = Collector::start(CollectorOptions {
        site_name: config.site_name.clone(),
        poll_interval: Duration::from_millis(config.poll_interval_ms),
        push,
        initial_scan: true,
    })?;
    let state = AppState {
        collector: collector.clone(),
    };

    let app = routes::create_api_router()
        .with_state(state)
        // 注入 request_id/trace_id
        .layer(middleware::from_fn(request_context));

    // 绑定失败是唯一的非零退出路径
    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    tracing::info!(target: "fronius.api", addr = %config.http_addr, "http listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(collector))
        .await?;
    Ok(())
}

/// 等待 ctrl-c，然后停掉节拍任务并关闭订阅队列。
async fn shutdown_signal(collector: Arc<Collector>) {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!(target: "fronius.api", "shutdown signal received");
    collector.shutdown();
}

async fn request_context(mut req: Request<Body>, next: Next) -> Response {
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
