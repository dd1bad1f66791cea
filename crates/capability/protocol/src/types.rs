//! 解析后的 Solar API 读数。

/// GetPowerFlowRealtimeData 的一次读数。
///
/// 功率取整到瓦；字段缺失或为 null 时保持 None。电池为正表示放电，
/// 电网为正表示买电。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PowerFlowReading {
    pub solar_w: Option<i64>,
    pub grid_w: Option<i64>,
    pub battery_w: Option<i64>,
    pub load_w: Option<i64>,
    pub soc_percent: Option<f64>,
    pub status_code: Option<i64>,
}

impl PowerFlowReading {
    /// 设备上报的故障码：StatusCode 存在且不为 7。
    pub fn fault_code(&self) -> Option<String> {
        match self.status_code {
            Some(code) if code != 7 => Some(code.to_string()),
            _ => None,
        }
    }
}

/// GetInverterInfo 的一次读数。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InverterInfoReading {
    pub unique_id: Option<String>,
    pub model: String,
    pub pv_power_w: Option<i64>,
    pub custom_name: Option<String>,
}
