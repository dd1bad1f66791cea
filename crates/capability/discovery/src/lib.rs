//! 局域网 Fronius 设备发现
//!
//! 流程：枚举本机 IPv4 子网 → 全网段主机探测灌满内核 ARP 缓存 →
//! 读 ARP 表拿候选 → 按候选并发确认 Solar API → 对确认设备做身份、
//! 角色与能力探测。角色判定：功率流响应带非空 P_Load 即为主机。

pub mod arp;
pub mod sweep;

use arp::ArpEntry;
use domain::{DiscoveredDevice, InverterInfo};
use fronius_protocol::SolarApiClient;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// ARP 缓存灌注后的沉降等待。
pub const ARP_SETTLE: Duration = Duration::from_secs(2);

/// 发现错误。单台设备探测失败不算错误，只有端到端失败才返回 Err。
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("no usable ipv4 interfaces")]
    NoInterfaces,
    #[error("failed to read arp table: {0}")]
    ArpRead(String),
}

/// 设备发现器。
#[derive(Debug, Clone)]
pub struct Discoverer {
    client: SolarApiClient,
}

impl Discoverer {
    pub fn new(client: SolarApiClient) -> Self {
        Self { client }
    }

    /// 执行一轮完整发现，返回当前可达的 Fronius 设备集合（顺序未定义）。
    pub async fn discover(&self) -> Result<Vec<DiscoveredDevice>, DiscoveryError> {
        let subnets = sweep::local_subnets();
        if subnets.is_empty() {
            return Err(DiscoveryError::NoInterfaces);
        }
        info!(
            target: "fronius.scan",
            subnets = subnets.len(),
            "sweep_started"
        );

        sweep::ping_sweep(&subnets).await;
        tokio::time::sleep(ARP_SETTLE).await;

        let entries = arp::read_arp_table().await?;
        info!(target: "fronius.scan", candidates = entries.len(), "arp_table_read");

        let mut probes = JoinSet::new();
        for entry in entries {
            let client = self.client.clone();
            probes.spawn(async move { probe_candidate(client, entry).await });
        }

        let mut devices = Vec::new();
        while let Some(joined) = probes.join_next().await {
            match joined {
                Ok(Some(device)) => devices.push(device),
                Ok(None) => {}
                Err(err) => warn!(target: "fronius.scan", error = %err, "probe_task_failed"),
            }
        }

        info!(target: "fronius.scan", devices = devices.len(), "sweep_finished");
        Ok(devices)
    }
}

/// 确认一个 ARP 候选并探测其身份与能力。
async fn probe_candidate(client: SolarApiClient, entry: ArpEntry) -> Option<DiscoveredDevice> {
    let ip = entry.ip.to_string();
    if !client.probe_api_version(&ip).await {
        return None;
    }
    debug!(target: "fronius.scan", ip = %ip, "fronius_confirmed");

    let (info, power_flow, battery, meter) = tokio::join!(
        client.probe_inverter_info(&ip),
        client.get_power_flow(&ip),
        client.probe_storage(&ip),
        client.probe_meter(&ip),
    );
    let info = match info {
        Ok(info) => Some(info),
        Err(err) => {
            warn!(target: "fronius.scan", ip = %ip, error = %err, "inverter_info_probe_failed");
            None
        }
    };
    let power_flow = power_flow.ok();
    let battery = battery.ok().flatten();
    let meter = meter.ok().flatten();

    let serial = info
        .as_ref()
        .and_then(|info| info.unique_id.clone())
        .unwrap_or_else(|| fallback_serial(&entry.mac));
    // 负载监测是主机的定义性特征
    let is_master = power_flow
        .map(|reading| reading.load_w.is_some())
        .unwrap_or(false);

    let info = match info {
        Some(info) => InverterInfo {
            model: info.model,
            pv_power_w: info.pv_power_w,
            custom_name: info.custom_name,
        },
        None => InverterInfo {
            model: "Unknown".to_string(),
            pv_power_w: None,
            custom_name: None,
        },
    };

    Some(DiscoveredDevice {
        serial,
        ip,
        mac: Some(entry.mac),
        hostname: entry.hostname,
        is_master,
        info,
        battery,
        meter,
    })
}

/// 序列号缺失时按 MAC 构造确定性替代值。
fn fallback_serial(mac: &str) -> String {
    format!("UNKNOWN_{}", mac.replace(':', ""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_serial_strips_colons() {
        assert_eq!(
            fallback_serial("aa:bb:cc:dd:ee:ff"),
            "UNKNOWN_aabbccddeeff"
        );
    }
}
