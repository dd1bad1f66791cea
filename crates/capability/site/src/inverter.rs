//! 单台逆变器：身份、能力记录、积分器与最近采样。

use chrono::{DateTime, Utc};
use domain::{
    BatteryInfo, DeviceSnapshot, DiscoveredDevice, EnergyCounters, Fault, HeartbeatStatus,
    InverterInfo, InverterMetrics, MeterInfo, Sample,
};
use fronius_energy::{BidirectionalIntegrator, EnergyIntegrator};
use fronius_protocol::PowerFlowReading;

/// 一台物理设备。
///
/// 序列号是唯一键；IP、主机名与角色在重扫时可变。能力记录在首次
/// 发现时确定。光伏积分器无条件存在，电池积分器随电池记录，电网
/// 积分器随主机角色。
#[derive(Debug, Clone)]
pub struct Inverter {
    serial: String,
    ip: String,
    hostname: Option<String>,
    mac: Option<String>,
    is_master: bool,
    info: InverterInfo,
    battery: Option<BatteryInfo>,
    meter: Option<MeterInfo>,
    solar: EnergyIntegrator,
    battery_flow: Option<BidirectionalIntegrator>,
    grid_flow: Option<BidirectionalIntegrator>,
    last_sample: Option<Sample>,
    online: bool,
    last_seen: Option<DateTime<Utc>>,
    fault: Option<Fault>,
}

impl Inverter {
    pub fn from_discovered(device: DiscoveredDevice) -> Self {
        let battery_flow = device.battery.as_ref().map(|_| BidirectionalIntegrator::new());
        let grid_flow = device.is_master.then(BidirectionalIntegrator::new);
        Self {
            serial: device.serial,
            ip: device.ip,
            hostname: device.hostname,
            mac: device.mac,
            is_master: device.is_master,
            info: device.info,
            battery: device.battery,
            meter: device.meter,
            solar: EnergyIntegrator::new(),
            battery_flow,
            grid_flow,
            last_sample: None,
            online: false,
            last_seen: None,
            fault: None,
        }
    }

    /// 重扫后更新可变身份字段；积分器与历史保留。
    /// 提升为主机时补建电网积分器，降级时保留已有计数。
    pub fn update_identity(&mut self, device: &DiscoveredDevice) {
        self.ip = device.ip.clone();
        self.hostname = device.hostname.clone();
        self.mac = device.mac.clone();
        self.is_master = device.is_master;
        if self.is_master && self.grid_flow.is_none() {
            self.grid_flow = Some(BidirectionalIntegrator::new());
        }
    }

    /// 应用一次成功的功率流读数。
    pub fn apply_success(&mut self, reading: PowerFlowReading, at: DateTime<Utc>) {
        match reading.solar_w {
            Some(watts) => self.solar.update_power(watts as f64, at),
            None => self.solar.invalidate_anchor(),
        }
        if let Some(flow) = self.battery_flow.as_mut() {
            match reading.battery_w {
                Some(watts) => flow.update_power(watts as f64, at),
                None => flow.invalidate_anchor(),
            }
        }
        if let Some(flow) = self.grid_flow.as_mut() {
            match reading.grid_w {
                Some(watts) => flow.update_power(watts as f64, at),
                None => flow.invalidate_anchor(),
            }
        }

        match reading.fault_code() {
            Some(code) => self.set_fault(code, at),
            None => self.fault = None,
        }

        self.last_sample = Some(Sample {
            timestamp: at,
            solar_w: reading.solar_w,
            battery_w: reading.battery_w,
            grid_w: reading.grid_w,
            load_w: reading.load_w,
            battery_soc: reading.soc_percent,
        });
        self.online = true;
        self.last_seen = Some(at);
    }

    /// 应用一次失败的轮询：设备离线，功率贡献退出聚合。
    /// 传输类失败记故障码；软失败（结构异常）不动故障状态。
    pub fn apply_failure(&mut self, fault_code: Option<String>, at: DateTime<Utc>) {
        if let Some(code) = fault_code {
            self.set_fault(code, at);
        }
        self.last_sample = None;
        self.online = false;
    }

    fn set_fault(&mut self, code: String, at: DateTime<Utc>) {
        // 同一故障持续出现时保留首次时间戳
        let unchanged = self
            .fault
            .as_ref()
            .is_some_and(|fault| fault.code == code);
        if !unchanged {
            self.fault = Some(Fault {
                code,
                timestamp: at,
            });
        }
    }

    /// 能量计数读数；尚无有效采样的积分器读作 null。
    pub fn energy(&self) -> EnergyCounters {
        EnergyCounters {
            solar_wh: self.solar.has_samples().then(|| self.solar.value_wh()),
            battery_in_wh: self
                .battery_flow
                .as_ref()
                .filter(|flow| flow.has_samples())
                .map(|flow| flow.negative_wh()),
            battery_out_wh: self
                .battery_flow
                .as_ref()
                .filter(|flow| flow.has_samples())
                .map(|flow| flow.positive_wh()),
            grid_in_wh: self
                .grid_flow
                .as_ref()
                .filter(|flow| flow.has_samples())
                .map(|flow| flow.positive_wh()),
            grid_out_wh: self
                .grid_flow
                .as_ref()
                .filter(|flow| flow.has_samples())
                .map(|flow| flow.negative_wh()),
        }
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }

    pub fn is_master(&self) -> bool {
        self.is_master
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn last_sample(&self) -> Option<&Sample> {
        self.last_sample.as_ref()
    }

    pub fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }

    pub fn has_battery(&self) -> bool {
        self.battery.is_some()
    }

    /// 展示名：自定义名优先，否则用型号。
    pub fn display_name(&self) -> String {
        self.info
            .custom_name
            .clone()
            .unwrap_or_else(|| self.info.model.clone())
    }

    pub fn heartbeat_status(&self) -> HeartbeatStatus {
        if self.online {
            HeartbeatStatus::Online
        } else {
            HeartbeatStatus::Offline
        }
    }

    /// 状态接口与 siteUpdate 用的设备快照。
    pub fn snapshot(&self) -> DeviceSnapshot {
        DeviceSnapshot {
            serial: self.serial.clone(),
            ip: self.ip.clone(),
            hostname: self.hostname.clone(),
            mac: self.mac.clone(),
            name: self.display_name(),
            is_master: self.is_master,
            online: self.online,
            info: self.info.clone(),
            battery: self.battery.clone(),
            meter: self.meter.clone(),
            last_seen: self.last_seen,
            fault: self.fault.clone(),
            energy: self.energy(),
        }
    }

    /// 聚合快照里的单机块。
    pub fn metrics_block(&self) -> InverterMetrics {
        let sample = self.last_sample.as_ref();
        InverterMetrics {
            serial: self.serial.clone(),
            name: self.display_name(),
            is_master: self.is_master,
            online: self.online,
            solar_w: sample.and_then(|s| s.solar_w),
            battery_w: sample.and_then(|s| s.battery_w),
            grid_w: sample.and_then(|s| s.grid_w),
            load_w: sample.and_then(|s| s.load_w),
            soc: sample.and_then(|s| s.battery_soc),
            energy: self.energy(),
        }
    }
}
