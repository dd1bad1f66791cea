//! 采集域的共享数据模型：设备身份、能力记录、采样值与能量计数。

use chrono::{DateTime, Utc};
use serde::Serialize;

/// 单台逆变器一次轮询得到的采样值。
///
/// 符号约定：电池为正表示放电、为负表示充电；电网为正表示买电、为负表示卖电。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    #[serde(with = "crate::time::serde_local")]
    pub timestamp: DateTime<Utc>,
    pub solar_w: Option<i64>,
    pub battery_w: Option<i64>,
    pub grid_w: Option<i64>,
    pub load_w: Option<i64>,
    #[serde(rename = "batterySOC")]
    pub battery_soc: Option<f64>,
}

/// 设备故障状态：故障码与发生时间。
///
/// 故障码要么是设备上报的状态码（非 7），要么是传输层分类
/// （TIMEOUT、CONNECTION_REFUSED、HOST_UNREACHABLE、HTTP_<code>、
/// NETWORK_ERROR、UNKNOWN_ERROR）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Fault {
    pub code: String,
    #[serde(with = "crate::time::serde_local")]
    pub timestamp: DateTime<Utc>,
}

/// 逆变器能力记录（发现时确定，轮询期间不变）。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InverterInfo {
    pub model: String,
    pub pv_power_w: Option<i64>,
    pub custom_name: Option<String>,
}

/// 电池能力记录。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatteryInfo {
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial: Option<String>,
    pub capacity_wh: Option<f64>,
    pub enabled: bool,
}

/// 电表能力记录。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeterInfo {
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial: Option<String>,
    pub location: MeterLocation,
    pub enabled: bool,
}

/// 电表安装位置分类（来自 Meter_Location_Current）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MeterLocation {
    Grid,
    Load,
    ExternalGenerator,
    Subload,
    EvCharger,
    Storage,
    Unknown,
}

impl MeterLocation {
    /// 按 Solar API 的位置编码分类。
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => MeterLocation::Grid,
            1 => MeterLocation::Load,
            3 => MeterLocation::ExternalGenerator,
            256..=511 => MeterLocation::Subload,
            512..=768 => MeterLocation::EvCharger,
            769..=1023 => MeterLocation::Storage,
            _ => MeterLocation::Unknown,
        }
    }
}

/// 发现阶段产出的设备记录：身份、角色与能力探测结果。
#[derive(Debug, Clone)]
pub struct DiscoveredDevice {
    pub serial: String,
    pub ip: String,
    pub mac: Option<String>,
    pub hostname: Option<String>,
    pub is_master: bool,
    pub info: InverterInfo,
    pub battery: Option<BatteryInfo>,
    pub meter: Option<MeterInfo>,
}

/// 单台逆变器的能量计数读数（瓦时）。
///
/// 在对应积分器尚未收到任何有效采样前，字段为 null。
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyCounters {
    pub solar_wh: Option<f64>,
    pub battery_in_wh: Option<f64>,
    pub battery_out_wh: Option<f64>,
    pub grid_in_wh: Option<f64>,
    pub grid_out_wh: Option<f64>,
}

/// 面向状态接口与 siteUpdate 事件的设备快照。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSnapshot {
    pub serial: String,
    pub ip: String,
    pub hostname: Option<String>,
    pub mac: Option<String>,
    pub name: String,
    pub is_master: bool,
    pub online: bool,
    pub info: InverterInfo,
    pub battery: Option<BatteryInfo>,
    pub meter: Option<MeterInfo>,
    #[serde(with = "crate::time::serde_local_opt")]
    pub last_seen: Option<DateTime<Utc>>,
    pub fault: Option<Fault>,
    pub energy: EnergyCounters,
}
