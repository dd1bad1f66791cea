//! 采集调度器与事件发布者。
//!
//! 进程级单例：驱动 2 秒轮询节拍、整分 +5 秒的分钟节拍与扫描任务，
//! 把结果发布到事件总线。站点是唯一的共享可变状态，轮询任务与扫描
//! 收编共用站点锁互斥；扫描的网络遍历不持锁，只有最终的
//! `adopt_discovered` 持锁。

use chrono::{DateTime, Timelike, Utc};
use domain::{DeviceSnapshot, Event, ScanState, ScanStatus, SiteBlock, SiteMetrics};
use fronius_bus::{EventBus, Subscription};
use fronius_discovery::Discoverer;
use fronius_protocol::{ProtocolError, SolarApiClient};
use fronius_push::{PushClient, PushClientStatus};
use fronius_site::Site;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

/// 分钟节拍相对整分的偏移（秒）。错开 :00 避免与设备自身的整分更新相撞。
pub const MINUTELY_OFFSET_SECS: i64 = 5;
/// 扫描期间 scanStatus 的重播间隔。
pub const SCAN_STATUS_INTERVAL: Duration = Duration::from_secs(1);

/// 采集器启动参数。
pub struct CollectorOptions {
    pub site_name: String,
    pub poll_interval: Duration,
    pub push: Arc<PushClient>,
    /// 启动时立即安排一次发现（测试关闭）。
    pub initial_scan: bool,
}

/// 状态接口需要的一次性快照。
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub device_count: usize,
    pub last_scan: Option<DateTime<Utc>>,
    pub is_scanning: bool,
    pub devices: Vec<DeviceSnapshot>,
    pub site: SiteBlock,
}

/// 采集器单例。
pub struct Collector {
    site: Arc<Mutex<Site>>,
    bus: Arc<EventBus>,
    push: Arc<PushClient>,
    scanning: Arc<AtomicBool>,
    scan_tx: mpsc::Sender<()>,
    shutdown_tx: watch::Sender<bool>,
}

impl Collector {
    /// 创建单例并启动全部后台任务。
    pub fn start(options: CollectorOptions) -> Result<Arc<Self>, ProtocolError> {
        let client = SolarApiClient::new()?;
        let discoverer = Discoverer::new(client.clone());
        let site = Arc::new(Mutex::new(Site::new(options.site_name.clone())));
        let bus = EventBus::new();
        let (scan_tx, scan_rx) = mpsc::channel(1);
        let (shutdown_tx, _) = watch::channel(false);
        let scanning = Arc::new(AtomicBool::new(false));

        info!(
            target: "fronius.collector",
            site = %options.site_name,
            poll_interval_ms = options.poll_interval.as_millis() as u64,
            "fronius gen24 collector starting"
        );

        let collector = Arc::new(Self {
            site: site.clone(),
            bus: bus.clone(),
            push: options.push.clone(),
            scanning: scanning.clone(),
            scan_tx,
            shutdown_tx: shutdown_tx.clone(),
        });

        tokio::spawn(scan_worker(
            scan_rx,
            discoverer,
            site.clone(),
            bus.clone(),
            scanning,
        ));
        tokio::spawn(poll_loop(
            options.poll_interval,
            client,
            site.clone(),
            bus.clone(),
            shutdown_tx.subscribe(),
        ));
        tokio::spawn(minutely_loop(
            site,
            bus.clone(),
            options.push.clone(),
            shutdown_tx.subscribe(),
        ));

        // 推送自检在自己的任务里跑，结果进总线
        let push = options.push;
        let test_bus = bus;
        tokio::spawn(async move {
            if let Some(result) = push.self_test().await {
                test_bus.publish(&Event::PushTest(result));
            }
        });

        if options.initial_scan {
            collector.scan();
        }
        Ok(collector)
    }

    /// 非阻塞触发一次重扫。
    ///
    /// 已在扫描中时收编为空操作，只重播一次 SCANNING 状态。
    pub fn scan(&self) {
        if self.scanning.swap(true, Ordering::SeqCst) {
            self.bus.publish(&Event::ScanStatus(ScanStatus {
                state: ScanState::Scanning,
            }));
            return;
        }
        if self.scan_tx.try_send(()).is_err() {
            // 工作任务已退出（进程收尾），复位标志即可
            self.scanning.store(false, Ordering::SeqCst);
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::SeqCst)
    }

    /// 注册订阅者并投递回放前奏。
    pub async fn subscribe(&self) -> Subscription {
        let replay = {
            let site = self.site.lock().await;
            let now = Utc::now();
            let mut events = Vec::new();
            events.push(Event::SiteUpdate(site.site_update(self.is_scanning(), now)));
            if let Some(metrics) = site.last_metrics() {
                events.push(Event::SiteMetrics(metrics.clone()));
            }
            events.push(Event::HiresHistory(site.history_snapshot()));
            events.push(Event::MinutelyHistory(site.minutely_snapshot()));
            if let Some(test) = self.push.last_test() {
                events.push(Event::PushTest(test));
            }
            events
        };
        self.bus.subscribe(replay)
    }

    /// 状态接口用的一次性快照（短暂持锁，不做 I/O）。
    pub async fn status_snapshot(&self) -> StatusSnapshot {
        let site = self.site.lock().await;
        let now = Utc::now();
        StatusSnapshot {
            device_count: site.device_count(),
            last_scan: site.last_scan(),
            is_scanning: self.is_scanning(),
            devices: site.device_snapshots(),
            site: site.build_site_metrics(now).site,
        }
    }

    /// 滚动历史快照。
    pub async fn history_snapshot(&self) -> Vec<SiteMetrics> {
        self.site.lock().await.history_snapshot()
    }

    pub fn push_status(&self) -> PushClientStatus {
        self.push.status()
    }

    /// 停止节拍任务并关闭全部订阅队列。
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        self.bus.close_all();
        info!(target: "fronius.collector", "collector stopped");
    }
}

/// 扫描工作任务：一次只跑一个扫描，期间每秒重播 SCANNING。
async fn scan_worker(
    mut scan_rx: mpsc::Receiver<()>,
    discoverer: Discoverer,
    site: Arc<Mutex<Site>>,
    bus: Arc<EventBus>,
    scanning: Arc<AtomicBool>,
) {
    while scan_rx.recv().await.is_some() {
        fronius_telemetry::record_scan_started();
        bus.publish(&Event::ScanStatus(ScanStatus {
            state: ScanState::Scanning,
        }));

        let sweep = discoverer.discover();
        tokio::pin!(sweep);
        let result = loop {
            tokio::select! {
                result = &mut sweep => break result,
                _ = tokio::time::sleep(SCAN_STATUS_INTERVAL) => {
                    bus.publish(&Event::ScanStatus(ScanStatus {
                        state: ScanState::Scanning,
                    }));
                }
            }
        };

        match result {
            Ok(devices) => {
                let mut site = site.lock().await;
                site.adopt_discovered(devices, Utc::now());
                fronius_telemetry::record_scan_completed();
            }
            Err(err) => {
                // 端到端失败：保留已有设备集合，继续轮询
                error!(target: "fronius.scan", error = %err, "scan_failed");
                fronius_telemetry::record_scan_failed();
            }
        }

        scanning.store(false, Ordering::SeqCst);
        bus.publish(&Event::ScanStatus(ScanStatus {
            state: ScanState::Idle,
        }));
        let update = {
            let site = site.lock().await;
            site.site_update(false, Utc::now())
        };
        bus.publish(&Event::SiteUpdate(update));
    }
}

/// 轮询节拍：每个节拍先发全部心跳，再发本节拍的聚合快照。
/// 上一拍尚未完成时跳过本拍（MissedTickBehavior::Skip）。
async fn poll_loop(
    interval: Duration,
    client: SolarApiClient,
    site: Arc<Mutex<Site>>,
    bus: Arc<EventBus>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => break,
        }
        let (heartbeats, metrics) = {
            let mut site = site.lock().await;
            site.poll(&client).await
        };
        for heartbeat in heartbeats {
            bus.publish(&Event::InverterHeartbeat(heartbeat));
        }
        bus.publish(&Event::SiteMetrics(metrics));
    }
}

/// 分钟节拍：对齐到下一个整分 +5 秒。
async fn minutely_loop(
    site: Arc<Mutex<Site>>,
    bus: Arc<EventBus>,
    push: Arc<PushClient>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let delay = delay_until_next_minutely(Utc::now());
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.changed() => break,
        }
        let report = {
            let mut site = site.lock().await;
            site.tick_minutely(Utc::now())
        };
        if let Some(report) = report {
            info!(
                target: "fronius.collector",
                sequence = %report.sequence,
                solar_interval_wh = report.solar_interval_wh,
                "minutely_report_generated"
            );
            bus.publish(&Event::FroniusMinutely(report.clone()));
            if push.is_active() {
                // 推送在自己的任务里跑，10 秒超时不阻塞轮询路径
                let push = push.clone();
                tokio::spawn(async move { push.push_report(&report).await });
            }
        } else {
            debug!(target: "fronius.collector", "minutely_skipped_no_data");
        }
    }
}

/// 距下一个「整分 +5 秒」时刻的等待时长。
pub fn delay_until_next_minutely(now: DateTime<Utc>) -> Duration {
    let millis_into_minute =
        (now.second() as i64) * 1000 + (now.timestamp_subsec_millis() as i64).min(999);
    let target = MINUTELY_OFFSET_SECS * 1000;
    let delay_ms = if millis_into_minute < target {
        target - millis_into_minute
    } else {
        60_000 + target - millis_into_minute
    };
    Duration::from_millis(delay_ms as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn minutely_delay_targets_offset_second() {
        let base = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(delay_until_next_minutely(base), Duration::from_secs(5));

        let at_three = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 3).unwrap();
        assert_eq!(delay_until_next_minutely(at_three), Duration::from_secs(2));

        let at_five = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 5).unwrap();
        assert_eq!(delay_until_next_minutely(at_five), Duration::from_secs(60));

        let late = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 59).unwrap();
        assert_eq!(delay_until_next_minutely(late), Duration::from_secs(6));
    }
}
