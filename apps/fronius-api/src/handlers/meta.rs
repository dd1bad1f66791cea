//! 健康检查与进程指标 handlers。

use axum::{response::IntoResponse, Json};

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}

pub async fn get_metrics() -> impl IntoResponse {
    Json(fronius_telemetry::metrics().snapshot())
}
