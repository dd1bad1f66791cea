//! Solar API 响应体解析。
//!
//! Gen24 固件在个别端点上有两种历史形态（映射键 "0"/"1" 或数组），
//! 解析统一走 `serde_json::Value` 导航，两种形态都接受。

use crate::error::ProtocolError;
use crate::types::{InverterInfoReading, PowerFlowReading};
use domain::{BatteryInfo, MeterInfo, MeterLocation};
use serde_json::Value;

/// GetAPIVersion 响应是否来自 Fronius 设备。
pub fn is_fronius_body(value: &Value) -> bool {
    value.as_object().is_some_and(|body| {
        body.contains_key("APIVersion") || body.contains_key("BaseURL") || body.contains_key("Body")
    })
}

/// 解析 GetPowerFlowRealtimeData 响应。
pub fn parse_power_flow(value: &Value) -> Result<PowerFlowReading, ProtocolError> {
    let site = value
        .pointer("/Body/Data/Site")
        .ok_or_else(|| ProtocolError::Shape("Body.Data.Site missing".to_string()))?;
    let inverter = first_entry(value.pointer("/Body/Data/Inverters"));
    Ok(PowerFlowReading {
        // 光伏按约定非负
        solar_w: power_field(site, "P_PV").map(|w| w.max(0)),
        grid_w: power_field(site, "P_Grid"),
        battery_w: power_field(site, "P_Akku"),
        load_w: power_field(site, "P_Load"),
        soc_percent: inverter
            .and_then(|entry| entry.get("SOC"))
            .and_then(Value::as_f64)
            .map(|soc| (soc * 10.0).round() / 10.0),
        status_code: inverter
            .and_then(|entry| entry.pointer("/DeviceStatus/StatusCode"))
            .and_then(Value::as_i64),
    })
}

/// 解析 GetInverterInfo 响应（取第一台设备）。
pub fn parse_inverter_info(value: &Value) -> Result<InverterInfoReading, ProtocolError> {
    let entry = first_entry(value.pointer("/Body/Data"))
        .ok_or_else(|| ProtocolError::Shape("Body.Data missing or empty".to_string()))?;
    let dt = entry.get("DT").and_then(Value::as_i64);
    let model = match dt {
        Some(dt) => device_type_name(dt)
            .map(str::to_string)
            .unwrap_or_else(|| format!("DT {dt}")),
        None => "Unknown".to_string(),
    };
    Ok(InverterInfoReading {
        unique_id: non_empty_string(entry.get("UniqueID")),
        model,
        pv_power_w: entry.get("PVPower").and_then(Value::as_f64).map(|w| w.round() as i64),
        custom_name: non_empty_string(entry.get("CustomName")),
    })
}

/// 解析 GetStorageRealtimeData 响应；无电池时返回 None。
pub fn parse_storage_info(value: &Value) -> Option<BatteryInfo> {
    // 两种形态：Body.Data["0"].Controller 或 Body.Data.Controller[0]
    let controller = value
        .pointer("/Body/Data/0/Controller")
        .or_else(|| value.pointer("/Body/Data/Controller/0"))?;
    Some(BatteryInfo {
        manufacturer: non_empty_string(controller.pointer("/Details/Manufacturer")),
        model: non_empty_string(controller.pointer("/Details/Model")),
        serial: non_empty_string(controller.pointer("/Details/Serial")),
        capacity_wh: controller.get("Capacity_Maximum").and_then(Value::as_f64),
        enabled: controller
            .get("Enable")
            .and_then(Value::as_f64)
            .map(|flag| flag != 0.0)
            .unwrap_or(false),
    })
}

/// 解析 GetMeterRealtimeData?Scope=System 响应；无电表时返回 None。
pub fn parse_meter_info(value: &Value) -> Option<MeterInfo> {
    let entry = first_entry(value.pointer("/Body/Data"))?;
    let model = non_empty_string(entry.pointer("/Details/Model"));
    let manufacturer = match &model {
        // CCS 系列电表的厂商字段不可靠
        Some(model) if model.starts_with("CCS") => {
            Some("Continental Control Systems".to_string())
        }
        _ => non_empty_string(entry.pointer("/Details/Manufacturer")),
    };
    Some(MeterInfo {
        manufacturer,
        model,
        serial: non_empty_string(entry.pointer("/Details/Serial")),
        location: entry
            .get("Meter_Location_Current")
            .and_then(Value::as_i64)
            .map(MeterLocation::from_code)
            .unwrap_or(MeterLocation::Unknown),
        enabled: entry
            .get("Enable")
            .and_then(Value::as_f64)
            .map(|flag| flag != 0.0)
            .unwrap_or(true),
    })
}

/// 设备类型表。
fn device_type_name(dt: i64) -> Option<&'static str> {
    match dt {
        1 => Some("Gen24"),
        _ => None,
    }
}

/// 取映射（按键排序的首个条目）或数组的第一个元素。
fn first_entry(value: Option<&Value>) -> Option<&Value> {
    match value? {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            keys.first().and_then(|key| map.get(*key))
        }
        Value::Array(items) => items.first(),
        _ => None,
    }
}

fn power_field(site: &Value, name: &str) -> Option<i64> {
    site.get(name).and_then(Value::as_f64).map(|w| w.round() as i64)
}

fn non_empty_string(value: Option<&Value>) -> Option<String> {
    let text = value?.as_str()?.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn api_version_detection() {
        assert!(is_fronius_body(&json!({"APIVersion": 1, "BaseURL": "/solar_api/v1/"})));
        assert!(is_fronius_body(&json!({"Body": {}})));
        assert!(!is_fronius_body(&json!({"title": "router admin"})));
        assert!(!is_fronius_body(&json!("plain string")));
    }

    #[test]
    fn power_flow_rounds_and_keeps_nulls() {
        let body = json!({
            "Body": {"Data": {
                "Site": {
                    "P_PV": 3000.4,
                    "P_Grid": -499.6,
                    "P_Akku": null,
                    "P_Load": -2500.2
                },
                "Inverters": {"1": {"SOC": 55.55, "DeviceStatus": {"StatusCode": 7}}}
            }}
        });
        let reading = parse_power_flow(&body).expect("reading");
        assert_eq!(reading.solar_w, Some(3000));
        assert_eq!(reading.grid_w, Some(-500));
        assert_eq!(reading.battery_w, None);
        assert_eq!(reading.load_w, Some(-2500));
        assert_eq!(reading.soc_percent, Some(55.6));
        assert_eq!(reading.fault_code(), None);
    }

    #[test]
    fn power_flow_inverters_array_shape() {
        let body = json!({
            "Body": {"Data": {
                "Site": {"P_PV": 120.0},
                "Inverters": [{"SOC": 80.0, "DeviceStatus": {"StatusCode": 9}}]
            }}
        });
        let reading = parse_power_flow(&body).expect("reading");
        assert_eq!(reading.soc_percent, Some(80.0));
        assert_eq!(reading.fault_code().as_deref(), Some("9"));
    }

    #[test]
    fn power_flow_missing_site_is_shape_error() {
        let body = json!({"Body": {"Data": {}}});
        let err = parse_power_flow(&body).expect_err("shape error");
        assert!(matches!(err, ProtocolError::Shape(_)));
        assert_eq!(err.fault_code(), None);
    }

    #[test]
    fn negative_solar_is_clamped() {
        let body = json!({
            "Body": {"Data": {"Site": {"P_PV": -3.2}, "Inverters": {}}}
        });
        let reading = parse_power_flow(&body).expect("reading");
        assert_eq!(reading.solar_w, Some(0));
    }

    #[test]
    fn inverter_info_maps_device_type() {
        let body = json!({
            "Body": {"Data": {"1": {
                "DT": 1,
                "UniqueID": "29301000123456",
                "CustomName": "Garage",
                "PVPower": 10000
            }}}
        });
        let info = parse_inverter_info(&body).expect("info");
        assert_eq!(info.unique_id.as_deref(), Some("29301000123456"));
        assert_eq!(info.model, "Gen24");
        assert_eq!(info.pv_power_w, Some(10000));
        assert_eq!(info.custom_name.as_deref(), Some("Garage"));
    }

    #[test]
    fn inverter_info_unknown_device_type() {
        let body = json!({"Body": {"Data": {"1": {"DT": 99, "UniqueID": "x"}}}});
        let info = parse_inverter_info(&body).expect("info");
        assert_eq!(info.model, "DT 99");
    }

    #[test]
    fn storage_both_shapes() {
        let keyed = json!({
            "Body": {"Data": {"0": {"Controller": {
                "Details": {"Manufacturer": "BYD", "Model": "BYD Battery-Box Premium HV", "Serial": "P030T020Z2"},
                "Capacity_Maximum": 10240.0,
                "Enable": 1.0
            }}}}
        });
        let battery = parse_storage_info(&keyed).expect("battery");
        assert_eq!(battery.manufacturer.as_deref(), Some("BYD"));
        assert_eq!(battery.capacity_wh, Some(10240.0));
        assert!(battery.enabled);

        let array = json!({
            "Body": {"Data": {"Controller": [{
                "Details": {"Manufacturer": "BYD"},
                "Capacity_Maximum": 5120.0,
                "Enable": 0.0
            }]}}
        });
        let battery = parse_storage_info(&array).expect("battery");
        assert_eq!(battery.capacity_wh, Some(5120.0));
        assert!(!battery.enabled);

        assert!(parse_storage_info(&json!({"Body": {"Data": {}}})).is_none());
    }

    #[test]
    fn meter_ccs_manufacturer_override() {
        let body = json!({
            "Body": {"Data": {"0": {
                "Details": {"Manufacturer": "Fronius", "Model": "CCS WattNode", "Serial": "123"},
                "Meter_Location_Current": 0,
                "Enable": 1
            }}}
        });
        let meter = parse_meter_info(&body).expect("meter");
        assert_eq!(meter.manufacturer.as_deref(), Some("Continental Control Systems"));
        assert_eq!(meter.location, MeterLocation::Grid);

        let no_meter = json!({"Body": {"Data": {}}});
        assert!(parse_meter_info(&no_meter).is_none());
    }
}
