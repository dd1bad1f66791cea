//! 分钟报文：一分钟内的能量增量与分钟末瞬时状态。
//!
//! 字段名与大小写是对外契约的一部分，下游摄取服务依赖它们。

use chrono::{DateTime, Utc};
use serde::Serialize;

/// 一条分钟报文。
///
/// 所有 `*IntervalWh` 字段是整数瓦时增量；六个 `*KwhTotal` 字段是
/// 进程启动以来的累计千瓦时（无数据时为 null）。`generatorStatus`
/// 为预留字段，始终为 null。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MinutelyReport {
    #[serde(with = "crate::time::serde_local")]
    pub timestamp: DateTime<Utc>,
    /// `XXXX/N`：进程级四位十六进制会话号 + 从 1 开始的单调计数。
    pub sequence: String,
    pub solar_w: Option<i64>,
    pub solar_interval_wh: i64,
    pub solar_local_w: Option<i64>,
    pub solar_local_interval_wh: i64,
    pub solar_remote_w: Option<i64>,
    pub solar_remote_interval_wh: i64,
    pub load_w: Option<i64>,
    pub load_interval_wh: i64,
    pub battery_w: Option<i64>,
    pub battery_in_interval_wh: i64,
    pub battery_out_interval_wh: i64,
    pub grid_w: Option<i64>,
    pub grid_in_interval_wh: i64,
    pub grid_out_interval_wh: i64,
    #[serde(rename = "batterySOC")]
    pub battery_soc: Option<f64>,
    pub fault_code: Option<String>,
    #[serde(with = "crate::time::serde_local_opt")]
    pub fault_timestamp: Option<DateTime<Utc>>,
    pub generator_status: Option<i64>,
    pub solar_kwh_total: Option<f64>,
    pub load_kwh_total: Option<f64>,
    pub battery_in_kwh_total: Option<f64>,
    pub battery_out_kwh_total: Option<f64>,
    pub grid_in_kwh_total: Option<f64>,
    pub grid_out_kwh_total: Option<f64>,
}

/// 解析序列号 `XXXX/N`，返回（会话号, 计数）。
pub fn parse_sequence(sequence: &str) -> Option<(&str, u64)> {
    let (session, counter) = sequence.split_once('/')?;
    if session.len() != 4 || !session.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some((session, counter.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn report_wire_field_names() {
        let report = MinutelyReport {
            timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 12, 1, 5).unwrap(),
            sequence: "a3f0/1".to_string(),
            solar_w: Some(3000),
            solar_interval_wh: 50,
            solar_local_w: Some(3000),
            solar_local_interval_wh: 50,
            solar_remote_w: Some(0),
            solar_remote_interval_wh: 0,
            load_w: Some(2500),
            load_interval_wh: 42,
            battery_w: Some(0),
            battery_in_interval_wh: 0,
            battery_out_interval_wh: 0,
            grid_w: Some(-500),
            grid_in_interval_wh: 0,
            grid_out_interval_wh: 8,
            battery_soc: None,
            fault_code: None,
            fault_timestamp: None,
            generator_status: None,
            solar_kwh_total: Some(0.05),
            load_kwh_total: Some(0.042),
            battery_in_kwh_total: None,
            battery_out_kwh_total: None,
            grid_in_kwh_total: Some(0.0),
            grid_out_kwh_total: Some(0.008),
        };
        let json = serde_json::to_value(&report).expect("serialize");
        for key in [
            "timestamp",
            "sequence",
            "solarW",
            "solarIntervalWh",
            "solarLocalW",
            "solarLocalIntervalWh",
            "solarRemoteW",
            "solarRemoteIntervalWh",
            "loadW",
            "loadIntervalWh",
            "batteryW",
            "batteryInIntervalWh",
            "batteryOutIntervalWh",
            "gridW",
            "gridInIntervalWh",
            "gridOutIntervalWh",
            "batterySOC",
            "faultCode",
            "faultTimestamp",
            "generatorStatus",
            "solarKwhTotal",
            "loadKwhTotal",
            "batteryInKwhTotal",
            "batteryOutKwhTotal",
            "gridInKwhTotal",
            "gridOutKwhTotal",
        ] {
            assert!(json.get(key).is_some(), "missing field {key}");
        }
        assert!(json["generatorStatus"].is_null());
    }

    #[test]
    fn sequence_parses() {
        assert_eq!(parse_sequence("a3f0/12"), Some(("a3f0", 12)));
        assert_eq!(parse_sequence("12/1"), None);
        assert_eq!(parse_sequence("zzzz/1"), None);
        assert_eq!(parse_sequence("a3f0"), None);
    }
}
