//! Solar API HTTP 客户端。

use crate::error::ProtocolError;
use crate::parse;
use crate::types::{InverterInfoReading, PowerFlowReading};
use domain::{BatteryInfo, MeterInfo};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// 功率流轮询超时。
pub const POWER_FLOW_TIMEOUT: Duration = Duration::from_secs(3);
/// 能力探测与 API 版本探测超时。
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Fronius Solar API 客户端（可克隆，内部连接池共享）。
#[derive(Debug, Clone)]
pub struct SolarApiClient {
    http: reqwest::Client,
}

impl SolarApiClient {
    pub fn new() -> Result<Self, ProtocolError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|err| ProtocolError::Unknown(err.to_string()))?;
        Ok(Self { http })
    }

    /// 轮询瞬时功率流。
    pub async fn get_power_flow(&self, ip: &str) -> Result<PowerFlowReading, ProtocolError> {
        let url = format!("http://{ip}/solar_api/v1/GetPowerFlowRealtimeData.fcgi");
        let body = self.get_json(&url, POWER_FLOW_TIMEOUT).await?;
        let reading = parse::parse_power_flow(&body)?;
        debug!(target: "fronius.protocol", ip, ?reading, "power_flow_read");
        Ok(reading)
    }

    /// 判定目标是否为 Fronius 设备（GetAPIVersion 可解析且带期望键）。
    pub async fn probe_api_version(&self, ip: &str) -> bool {
        let url = format!("http://{ip}/solar_api/GetAPIVersion.cgi");
        match self.get_json(&url, PROBE_TIMEOUT).await {
            Ok(body) => parse::is_fronius_body(&body),
            Err(_) => false,
        }
    }

    /// 探测逆变器身份与能力（仅发现期间调用）。
    pub async fn probe_inverter_info(&self, ip: &str) -> Result<InverterInfoReading, ProtocolError> {
        let url = format!("http://{ip}/solar_api/v1/GetInverterInfo.cgi");
        let body = self.get_json(&url, PROBE_TIMEOUT).await?;
        parse::parse_inverter_info(&body)
    }

    /// 探测电池（仅发现期间调用）。
    pub async fn probe_storage(&self, ip: &str) -> Result<Option<BatteryInfo>, ProtocolError> {
        let url = format!("http://{ip}/solar_api/v1/GetStorageRealtimeData.cgi");
        let body = self.get_json(&url, PROBE_TIMEOUT).await?;
        Ok(parse::parse_storage_info(&body))
    }

    /// 探测电表（仅发现期间调用）。
    pub async fn probe_meter(&self, ip: &str) -> Result<Option<MeterInfo>, ProtocolError> {
        let url = format!("http://{ip}/solar_api/v1/GetMeterRealtimeData.cgi?Scope=System");
        let body = self.get_json(&url, PROBE_TIMEOUT).await?;
        Ok(parse::parse_meter_info(&body))
    }

    async fn get_json(&self, url: &str, timeout: Duration) -> Result<Value, ProtocolError> {
        let response = self
            .http
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(ProtocolError::from_reqwest)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProtocolError::HttpStatus(status.as_u16()));
        }
        response.json::<Value>().await.map_err(|err| {
            if err.is_timeout() {
                ProtocolError::Timeout
            } else {
                ProtocolError::Shape(err.to_string())
            }
        })
    }
}
