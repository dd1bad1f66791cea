//! 站点：逆变器集合的唯一拥有者。
//!
//! 聚合、滚动历史与分钟报文都在这里派生。站点负载能量永远按能量
//! 守恒推导（光伏 + 买电 + 放电 − 卖电 − 充电），主机上报的 P_Load
//! 只进采样展示，不参与能量推导。

use crate::inverter::Inverter;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use domain::{
    BatteryBlock, DeviceSnapshot, DiscoveredDevice, GridBlock, InverterHeartbeat, MinutelyReport,
    PowerBlock, SiteBlock, SiteFault, SiteMetrics, SiteUpdate,
};
use fronius_energy::{EnergyTotals, SnapshotLedger};
use fronius_protocol::{PowerFlowReading, ProtocolError, SolarApiClient};
use std::collections::BTreeMap;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// 滚动历史容量（10 分钟 × 每 2 秒一条）。
pub const HISTORY_CAPACITY: usize = 300;
/// 滚动历史时间窗（秒）。
pub const HISTORY_WINDOW_SECS: i64 = 600;
/// 分钟报文历史深度。
pub const MINUTELY_HISTORY_DEPTH: usize = 20;

/// 站点聚合用的能量读数（各量可能尚无数据）。
#[derive(Debug, Clone, Copy, Default)]
struct SiteEnergy {
    solar_wh: Option<f64>,
    battery_in_wh: Option<f64>,
    battery_out_wh: Option<f64>,
    grid_in_wh: Option<f64>,
    grid_out_wh: Option<f64>,
}

impl SiteEnergy {
    /// 能量守恒推导的站点负载能量。
    fn load_wh(&self) -> Option<f64> {
        if self.solar_wh.is_none()
            && self.grid_in_wh.is_none()
            && self.grid_out_wh.is_none()
            && self.battery_in_wh.is_none()
            && self.battery_out_wh.is_none()
        {
            return None;
        }
        let balance = self.solar_wh.unwrap_or(0.0) + self.grid_in_wh.unwrap_or(0.0)
            + self.battery_out_wh.unwrap_or(0.0)
            - self.grid_out_wh.unwrap_or(0.0)
            - self.battery_in_wh.unwrap_or(0.0);
        Some(balance.max(0.0))
    }
}

/// 站点。序列号为键，迭代顺序稳定。
pub struct Site {
    name: String,
    inverters: BTreeMap<String, Inverter>,
    history: std::collections::VecDeque<SiteMetrics>,
    minutely_history: std::collections::VecDeque<MinutelyReport>,
    ledger: SnapshotLedger,
    session_id: String,
    sequence: u64,
    last_metrics: Option<SiteMetrics>,
    last_scan: Option<DateTime<Utc>>,
}

impl Site {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_session(name, format!("{:04x}", rand::random::<u16>()))
    }

    /// 指定会话号构造（测试用）。
    pub fn with_session(name: impl Into<String>, session_id: String) -> Self {
        Self {
            name: name.into(),
            inverters: BTreeMap::new(),
            history: std::collections::VecDeque::new(),
            minutely_history: std::collections::VecDeque::new(),
            ledger: SnapshotLedger::new(),
            session_id,
            sequence: 0,
            last_metrics: None,
            last_scan: None,
        }
    }

    /// 原子替换设备集合。
    ///
    /// 已知序列号只更新可变身份字段，积分器与历史保留；列表之外的
    /// 序列号被移除。
    pub fn adopt_discovered(&mut self, devices: Vec<DiscoveredDevice>, at: DateTime<Utc>) {
        let mut kept = 0_usize;
        let mut added = 0_usize;
        let incoming: Vec<String> = devices.iter().map(|device| device.serial.clone()).collect();

        for device in devices {
            match self.inverters.get_mut(&device.serial) {
                Some(existing) => {
                    existing.update_identity(&device);
                    kept += 1;
                }
                None => {
                    self.inverters
                        .insert(device.serial.clone(), Inverter::from_discovered(device));
                    added += 1;
                }
            }
        }

        let before = self.inverters.len();
        self.inverters.retain(|serial, _| incoming.contains(serial));
        let removed = before - self.inverters.len();
        self.last_scan = Some(at);

        info!(
            target: "fronius.scan",
            kept,
            added,
            removed,
            "device_set_adopted"
        );
    }

    /// 对全部设备并发轮询，应用结果后生成聚合快照并入滚动历史。
    /// 返回本节拍的心跳事件与快照。
    pub async fn poll(&mut self, client: &SolarApiClient) -> (Vec<InverterHeartbeat>, SiteMetrics) {
        fronius_telemetry::record_poll_started();
        let targets: Vec<(String, String)> = self
            .inverters
            .values()
            .map(|inverter| (inverter.serial().to_string(), inverter.ip().to_string()))
            .collect();

        let mut fetches = JoinSet::new();
        for (serial, ip) in targets {
            let client = client.clone();
            fetches.spawn(async move {
                let result = client.get_power_flow(&ip).await;
                (serial, result, Utc::now())
            });
        }
        while let Some(joined) = fetches.join_next().await {
            match joined {
                Ok((serial, result, at)) => self.apply_power_flow(&serial, result, at),
                Err(err) => warn!(target: "fronius.poll", error = %err, "poll_task_failed"),
            }
        }

        let now = Utc::now();
        let metrics = self.build_site_metrics(now);
        self.record_metrics(metrics.clone(), now);
        (self.heartbeats(now), metrics)
    }

    /// 应用单台设备的轮询结果（轮询与测试共用的入口）。
    pub fn apply_power_flow(
        &mut self,
        serial: &str,
        result: Result<PowerFlowReading, ProtocolError>,
        at: DateTime<Utc>,
    ) {
        let Some(inverter) = self.inverters.get_mut(serial) else {
            return;
        };
        match result {
            Ok(reading) => {
                inverter.apply_success(reading, at);
                fronius_telemetry::record_poll_succeeded();
            }
            Err(err) => {
                warn!(
                    target: "fronius.poll",
                    serial,
                    error = %err,
                    "power_flow_poll_failed"
                );
                inverter.apply_failure(err.fault_code(), at);
                fronius_telemetry::record_poll_failed();
            }
        }
    }

    /// 聚合快照。
    pub fn build_site_metrics(&self, now: DateTime<Utc>) -> SiteMetrics {
        let inverters: Vec<_> = self
            .inverters
            .values()
            .map(|inverter| inverter.metrics_block())
            .collect();

        let solar_power = sum_present(
            self.inverters
                .values()
                .map(|inverter| inverter.last_sample().and_then(|s| s.solar_w)),
        );
        let battery_power = sum_present(
            self.inverters
                .values()
                .filter(|inverter| inverter.has_battery())
                .map(|inverter| inverter.last_sample().and_then(|s| s.battery_w)),
        );
        let grid_power = self
            .inverters
            .values()
            .find(|inverter| inverter.is_master())
            .and_then(|master| master.last_sample().and_then(|s| s.grid_w));
        let soc = mean_present(
            self.inverters
                .values()
                .map(|inverter| inverter.last_sample().and_then(|s| s.battery_soc)),
        );

        let load_power = if solar_power.is_none() && battery_power.is_none() && grid_power.is_none()
        {
            None
        } else {
            let balance =
                solar_power.unwrap_or(0) + grid_power.unwrap_or(0) + battery_power.unwrap_or(0);
            Some(balance.max(0))
        };

        let energy = self.site_energy();
        let faults: Vec<SiteFault> = self
            .inverters
            .values()
            .filter_map(|inverter| {
                inverter.fault().map(|fault| SiteFault {
                    serial: inverter.serial().to_string(),
                    code: fault.code.clone(),
                    timestamp: fault.timestamp,
                })
            })
            .collect();

        SiteMetrics {
            timestamp: now,
            inverters,
            site: SiteBlock {
                name: self.name.clone(),
                solar: PowerBlock {
                    power_w: solar_power,
                    energy_wh: energy.solar_wh,
                },
                battery: BatteryBlock {
                    power_w: battery_power,
                    soc,
                    in_wh: energy.battery_in_wh,
                    out_wh: energy.battery_out_wh,
                },
                grid: GridBlock {
                    power_w: grid_power,
                    in_wh: energy.grid_in_wh,
                    out_wh: energy.grid_out_wh,
                },
                load: PowerBlock {
                    power_w: load_power,
                    energy_wh: energy.load_wh(),
                },
                has_fault: !faults.is_empty(),
                faults,
            },
        }
    }

    /// 快照入滚动历史并登记为最新值。
    pub fn record_metrics(&mut self, metrics: SiteMetrics, now: DateTime<Utc>) {
        self.history.push_back(metrics.clone());
        let cutoff = now - ChronoDuration::seconds(HISTORY_WINDOW_SECS);
        while let Some(front) = self.history.front() {
            if front.timestamp < cutoff || self.history.len() > HISTORY_CAPACITY {
                self.history.pop_front();
            } else {
                break;
            }
        }
        self.last_metrics = Some(metrics);
    }

    /// 分钟节拍：生成分钟报文。
    ///
    /// 没有任何能量数据或台账引导期返回 None；否则报告取整增量并
    /// 推进序列计数。
    pub fn tick_minutely(&mut self, now: DateTime<Utc>) -> Option<MinutelyReport> {
        let energy = self.site_energy();
        if energy.solar_wh.is_none() && energy.grid_in_wh.is_none() {
            return None;
        }

        let current = EnergyTotals {
            solar_wh: energy.solar_wh.unwrap_or(0.0),
            battery_in_wh: energy.battery_in_wh.unwrap_or(0.0),
            battery_out_wh: energy.battery_out_wh.unwrap_or(0.0),
            grid_in_wh: energy.grid_in_wh.unwrap_or(0.0),
            grid_out_wh: energy.grid_out_wh.unwrap_or(0.0),
            load_wh: energy.load_wh().unwrap_or(0.0),
        };
        let deltas = self.ledger.advance(current)?;

        self.sequence += 1;

        let master_power = sum_present(
            self.inverters
                .values()
                .filter(|inverter| inverter.is_master())
                .map(|inverter| inverter.last_sample().and_then(|s| s.solar_w)),
        );
        let slave_power = sum_present(
            self.inverters
                .values()
                .filter(|inverter| !inverter.is_master())
                .map(|inverter| inverter.last_sample().and_then(|s| s.solar_w)),
        );
        let (local_wh, remote_wh) = split_solar_delta(
            deltas.solar_wh,
            master_power.unwrap_or(0),
            slave_power.unwrap_or(0),
        );

        let site = self.last_metrics.as_ref().map(|metrics| &metrics.site);
        let first_fault = site.and_then(|block| block.faults.first());

        let report = MinutelyReport {
            timestamp: now,
            sequence: format!("{}/{}", self.session_id, self.sequence),
            solar_w: site.and_then(|block| block.solar.power_w),
            solar_interval_wh: deltas.solar_wh,
            solar_local_w: master_power,
            solar_local_interval_wh: local_wh,
            solar_remote_w: slave_power,
            solar_remote_interval_wh: remote_wh,
            load_w: site.and_then(|block| block.load.power_w),
            load_interval_wh: deltas.load_wh,
            battery_w: site.and_then(|block| block.battery.power_w),
            battery_in_interval_wh: deltas.battery_in_wh,
            battery_out_interval_wh: deltas.battery_out_wh,
            grid_w: site.and_then(|block| block.grid.power_w),
            grid_in_interval_wh: deltas.grid_in_wh,
            grid_out_interval_wh: deltas.grid_out_wh,
            battery_soc: site
                .and_then(|block| block.battery.soc)
                .map(|soc| (soc * 10.0).round() / 10.0),
            fault_code: first_fault.map(|fault| fault.code.clone()),
            fault_timestamp: first_fault.map(|fault| fault.timestamp),
            generator_status: None,
            solar_kwh_total: energy.solar_wh.map(to_kwh),
            load_kwh_total: energy.load_wh().map(to_kwh),
            battery_in_kwh_total: energy.battery_in_wh.map(to_kwh),
            battery_out_kwh_total: energy.battery_out_wh.map(to_kwh),
            grid_in_kwh_total: energy.grid_in_wh.map(to_kwh),
            grid_out_kwh_total: energy.grid_out_wh.map(to_kwh),
        };

        self.minutely_history.push_back(report.clone());
        while self.minutely_history.len() > MINUTELY_HISTORY_DEPTH {
            self.minutely_history.pop_front();
        }
        fronius_telemetry::record_minutely_report();
        Some(report)
    }

    fn site_energy(&self) -> SiteEnergy {
        let mut energy = SiteEnergy::default();
        for inverter in self.inverters.values() {
            let counters = inverter.energy();
            energy.solar_wh = add_opt(energy.solar_wh, counters.solar_wh);
            energy.battery_in_wh = add_opt(energy.battery_in_wh, counters.battery_in_wh);
            energy.battery_out_wh = add_opt(energy.battery_out_wh, counters.battery_out_wh);
            if inverter.is_master() {
                energy.grid_in_wh = add_opt(energy.grid_in_wh, counters.grid_in_wh);
                energy.grid_out_wh = add_opt(energy.grid_out_wh, counters.grid_out_wh);
            }
        }
        energy
    }

    /// 本节拍的心跳事件（按序列号顺序）。
    pub fn heartbeats(&self, now: DateTime<Utc>) -> Vec<InverterHeartbeat> {
        self.inverters
            .values()
            .map(|inverter| InverterHeartbeat {
                serial: inverter.serial().to_string(),
                status: inverter.heartbeat_status(),
                timestamp: now,
            })
            .collect()
    }

    pub fn device_snapshots(&self) -> Vec<DeviceSnapshot> {
        self.inverters
            .values()
            .map(|inverter| inverter.snapshot())
            .collect()
    }

    /// siteUpdate 事件载荷。
    pub fn site_update(&self, is_scanning: bool, now: DateTime<Utc>) -> SiteUpdate {
        SiteUpdate {
            device_count: self.inverters.len(),
            last_scan: self.last_scan,
            is_scanning,
            devices: self.device_snapshots(),
            site: self.build_site_metrics(now).site,
        }
    }

    pub fn last_metrics(&self) -> Option<&SiteMetrics> {
        self.last_metrics.as_ref()
    }

    pub fn last_scan(&self) -> Option<DateTime<Utc>> {
        self.last_scan
    }

    pub fn device_count(&self) -> usize {
        self.inverters.len()
    }

    pub fn history_snapshot(&self) -> Vec<SiteMetrics> {
        self.history.iter().cloned().collect()
    }

    pub fn minutely_snapshot(&self) -> Vec<MinutelyReport> {
        self.minutely_history.iter().cloned().collect()
    }
}

/// 有值项求和；全缺省时返回 None。
fn sum_present(values: impl Iterator<Item = Option<i64>>) -> Option<i64> {
    values.flatten().fold(None, |acc, value| Some(acc.unwrap_or(0) + value))
}

/// 有值项算术平均（一位小数）；全缺省时返回 None。
fn mean_present(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let present: Vec<f64> = values.flatten().collect();
    if present.is_empty() {
        return None;
    }
    let mean = present.iter().sum::<f64>() / present.len() as f64;
    Some((mean * 10.0).round() / 10.0)
}

fn add_opt(acc: Option<f64>, value: Option<f64>) -> Option<f64> {
    match (acc, value) {
        (Some(acc), Some(value)) => Some(acc + value),
        (Some(acc), None) => Some(acc),
        (None, Some(value)) => Some(value),
        (None, None) => None,
    }
}

/// 按瞬时功率比例拆分分钟光伏增量：主机份取整，从机份取余，
/// 两份之和恒等于总增量。
fn split_solar_delta(delta_wh: i64, master_w: i64, slave_w: i64) -> (i64, i64) {
    if delta_wh <= 0 || master_w + slave_w <= 0 {
        return (0, 0);
    }
    let ratio = master_w as f64 / (master_w + slave_w) as f64;
    let local = (delta_wh as f64 * ratio).round() as i64;
    (local, delta_wh - local)
}

fn to_kwh(wh: f64) -> f64 {
    (wh / 1000.0 * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum_present_ignores_missing() {
        assert_eq!(sum_present([Some(1), None, Some(2)].into_iter()), Some(3));
        assert_eq!(sum_present([None, None].into_iter()), None);
        assert_eq!(sum_present(std::iter::empty::<Option<i64>>()), None);
    }

    #[test]
    fn mean_present_rounds_one_decimal() {
        assert_eq!(
            mean_present([Some(50.0), Some(51.25), None].into_iter()),
            Some(50.6)
        );
        assert_eq!(mean_present([None].into_iter()), None);
    }

    #[test]
    fn solar_split_is_exact() {
        let (local, remote) = split_solar_delta(50, 3000, 1000);
        assert_eq!(local + remote, 50);
        assert_eq!(local, 38);
        assert_eq!(remote, 12);
        assert_eq!(split_solar_delta(50, 0, 0), (0, 0));
        assert_eq!(split_solar_delta(0, 3000, 1000), (0, 0));
        assert_eq!(split_solar_delta(-3, 3000, 1000), (0, 0));
    }

    #[test]
    fn kwh_rounds_three_decimals() {
        assert_eq!(to_kwh(1234.5678), 1.235);
        assert_eq!(to_kwh(0.0), 0.0);
    }
}
