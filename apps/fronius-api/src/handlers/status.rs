//! 状态查询 handlers
//!
//! - GET /api/status

use crate::state::AppState;
use crate::utils::response::push_to_dto;
use api_contract::StatusResponse;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::time::format_local;

pub async fn get_status(State(state): State<AppState>) -> Response {
    let snapshot = state.collector.status_snapshot().await;
    let push = state.collector.push_status();
    let response = StatusResponse {
        success: true,
        device_count: snapshot.device_count,
        last_scan: snapshot.last_scan.map(format_local),
        is_scanning: snapshot.is_scanning,
        devices: snapshot.devices,
        site: snapshot.site,
        push: push_to_dto(push),
    };
    (StatusCode::OK, Json(response)).into_response()
}
