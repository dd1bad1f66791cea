//! 滚动历史 handlers
//!
//! - GET /api/history：按序列号给出最近 10 分钟的逐拍采样。

use crate::state::AppState;
use api_contract::{HistoryResponse, HistorySample};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::time::format_local;
use std::collections::BTreeMap;

pub async fn get_history(State(state): State<AppState>) -> Response {
    let snapshots = state.collector.history_snapshot().await;
    let mut history: BTreeMap<String, Vec<HistorySample>> = BTreeMap::new();
    for metrics in &snapshots {
        let timestamp = format_local(metrics.timestamp);
        for inverter in &metrics.inverters {
            history
                .entry(inverter.serial.clone())
                .or_default()
                .push(HistorySample {
                    timestamp: timestamp.clone(),
                    solar: inverter.solar_w,
                    battery: inverter.battery_w,
                    grid: inverter.grid_w,
                    load: inverter.load_w,
                    soc: inverter.soc.map(|soc| (soc * 10.0).round() / 10.0),
                });
        }
    }
    (
        StatusCode::OK,
        Json(HistoryResponse {
            success: true,
            history,
        }),
    )
        .into_response()
}
