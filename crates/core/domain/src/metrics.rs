//! 站点级聚合快照：每次轮询后生成，同时也是滚动历史的元素。

use crate::data::EnergyCounters;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// 单台逆变器在一次聚合快照里的功率与能量块。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InverterMetrics {
    pub serial: String,
    pub name: String,
    pub is_master: bool,
    pub online: bool,
    pub solar_w: Option<i64>,
    pub battery_w: Option<i64>,
    pub grid_w: Option<i64>,
    pub load_w: Option<i64>,
    pub soc: Option<f64>,
    pub energy: EnergyCounters,
}

/// 单向量（光伏、负载）的功率 + 能量块。
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerBlock {
    pub power_w: Option<i64>,
    pub energy_wh: Option<f64>,
}

/// 电池块：功率、平均 SOC 与双向能量计数。
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatteryBlock {
    pub power_w: Option<i64>,
    pub soc: Option<f64>,
    pub in_wh: Option<f64>,
    pub out_wh: Option<f64>,
}

/// 电网块：功率与买电/卖电能量计数。
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridBlock {
    pub power_w: Option<i64>,
    pub in_wh: Option<f64>,
    pub out_wh: Option<f64>,
}

/// 站点故障条目。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteFault {
    pub serial: String,
    pub code: String,
    #[serde(with = "crate::time::serde_local")]
    pub timestamp: DateTime<Utc>,
}

/// 站点聚合块。负载能量永远按能量守恒推导，不使用主机上报的 P_Load。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteBlock {
    pub name: String,
    pub solar: PowerBlock,
    pub battery: BatteryBlock,
    pub grid: GridBlock,
    pub load: PowerBlock,
    pub has_fault: bool,
    pub faults: Vec<SiteFault>,
}

/// 一次轮询后的完整站点快照。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteMetrics {
    #[serde(with = "crate::time::serde_local")]
    pub timestamp: DateTime<Utc>,
    pub inverters: Vec<InverterMetrics>,
    pub site: SiteBlock,
}
