//! 稳定的入站 HTTP 契约。
//!
//! 所有响应都是扁平的 `{success: bool, …}` 信封：成功响应把业务字段
//! 平铺在 `success` 旁边，失败响应只带 `error` 字符串。字段名与大小写
//! 是对外契约的一部分。

use domain::{DeviceSnapshot, SiteBlock};
use serde::{Deserialize, Serialize};

/// 失败响应体：`{success: false, error: "..."}`。
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// `GET /api/status` 响应体。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub success: bool,
    pub device_count: usize,
    pub last_scan: Option<String>,
    pub is_scanning: bool,
    pub devices: Vec<DeviceSnapshot>,
    pub site: SiteBlock,
    pub push: Option<PushStatus>,
}

/// 推送客户端在状态接口里暴露的只读状态块。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushStatus {
    pub configured: bool,
    pub enabled: bool,
    pub state: String,
    pub last_push_timestamp: Option<String>,
}

/// `POST /api/do` 请求体。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoRequest {
    pub action: String,
}

/// `POST /api/do` 成功响应体。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoResponse {
    pub success: bool,
    pub message: String,
}

/// `GET /api/history` 里单台设备的一条采样。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySample {
    pub timestamp: String,
    pub solar: Option<i64>,
    pub battery: Option<i64>,
    pub grid: Option<i64>,
    pub load: Option<i64>,
    pub soc: Option<f64>,
}

/// `GET /api/history` 响应体：序列号 → 采样序列。
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub history: std::collections::BTreeMap<String, Vec<HistorySample>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{BatteryBlock, GridBlock, PowerBlock};

    fn empty_site() -> SiteBlock {
        SiteBlock {
            name: "fronius".to_string(),
            solar: PowerBlock::default(),
            battery: BatteryBlock::default(),
            grid: GridBlock::default(),
            load: PowerBlock::default(),
            has_fault: false,
            faults: Vec::new(),
        }
    }

    #[test]
    fn error_response_shape() {
        let json = serde_json::to_value(ErrorResponse::new("Invalid action")).expect("serialize");
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Invalid action");
    }

    #[test]
    fn status_response_is_flat() {
        let response = StatusResponse {
            success: true,
            device_count: 0,
            last_scan: None,
            is_scanning: true,
            devices: Vec::new(),
            site: empty_site(),
            push: None,
        };
        let json = serde_json::to_value(&response).expect("serialize");
        assert_eq!(json["success"], true);
        assert_eq!(json["deviceCount"], 0);
        assert_eq!(json["isScanning"], true);
        assert!(json["lastScan"].is_null());
        assert!(json["devices"].as_array().expect("array").is_empty());
        // 冷启动时站点块存在且数值全空
        assert!(json["site"]["solar"]["powerW"].is_null());
        assert_eq!(json["site"]["hasFault"], false);
    }
}
