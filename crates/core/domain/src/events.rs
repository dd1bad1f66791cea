//! 事件总线上的事件类型与主题名。
//!
//! 主题名同时用作 SSE 的事件名，属于对外契约。

use crate::data::DeviceSnapshot;
use crate::metrics::{SiteBlock, SiteMetrics};
use crate::report::MinutelyReport;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// 扫描状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScanState {
    #[serde(rename = "SCANNING")]
    Scanning,
    #[serde(rename = "IDLE")]
    Idle,
}

/// `scanStatus` 事件载荷。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStatus {
    pub state: ScanState,
}

/// 心跳状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HeartbeatStatus {
    #[serde(rename = "online")]
    Online,
    #[serde(rename = "offline")]
    Offline,
}

/// `inverterHeartbeat` 事件载荷：每个轮询节拍每台设备一条。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InverterHeartbeat {
    pub serial: String,
    pub status: HeartbeatStatus,
    #[serde(with = "crate::time::serde_local")]
    pub timestamp: DateTime<Utc>,
}

/// `siteUpdate` 事件载荷：设备集合变化后的站点快照。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteUpdate {
    pub device_count: usize,
    #[serde(with = "crate::time::serde_local_opt")]
    pub last_scan: Option<DateTime<Utc>>,
    pub is_scanning: bool,
    pub devices: Vec<DeviceSnapshot>,
    pub site: SiteBlock,
}

/// `pushTest` 事件载荷：推送客户端自检结果。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushTestResult {
    pub success: bool,
    pub message: Option<String>,
    pub display_name: Option<String>,
    #[serde(with = "crate::time::serde_local")]
    pub timestamp: DateTime<Utc>,
}

/// 总线事件。`HiresHistory` 与 `MinutelyHistory` 只出现在订阅时的回放中。
#[derive(Debug, Clone)]
pub enum Event {
    ScanStatus(ScanStatus),
    SiteUpdate(SiteUpdate),
    SiteMetrics(SiteMetrics),
    InverterHeartbeat(InverterHeartbeat),
    FroniusMinutely(MinutelyReport),
    PushTest(PushTestResult),
    HiresHistory(Vec<SiteMetrics>),
    MinutelyHistory(Vec<MinutelyReport>),
}

impl Event {
    /// 事件主题名，同时作为 SSE 事件名。
    pub fn topic(&self) -> &'static str {
        match self {
            Event::ScanStatus(_) => "scanStatus",
            Event::SiteUpdate(_) => "siteUpdate",
            Event::SiteMetrics(_) => "siteMetrics",
            Event::InverterHeartbeat(_) => "inverterHeartbeat",
            Event::FroniusMinutely(_) => "froniusMinutely",
            Event::PushTest(_) => "pushTest",
            Event::HiresHistory(_) => "hiresHistory",
            Event::MinutelyHistory(_) => "minutelyHistory",
        }
    }

    /// 事件载荷的 JSON 形式。
    pub fn payload(&self) -> Value {
        let result = match self {
            Event::ScanStatus(payload) => serde_json::to_value(payload),
            Event::SiteUpdate(payload) => serde_json::to_value(payload),
            Event::SiteMetrics(payload) => serde_json::to_value(payload),
            Event::InverterHeartbeat(payload) => serde_json::to_value(payload),
            Event::FroniusMinutely(payload) => serde_json::to_value(payload),
            Event::PushTest(payload) => serde_json::to_value(payload),
            Event::HiresHistory(payload) => serde_json::to_value(payload),
            Event::MinutelyHistory(payload) => serde_json::to_value(payload),
        };
        result.unwrap_or(Value::Null)
    }
}
