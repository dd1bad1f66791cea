//! 追踪初始化、请求 ID 与采集进程指标。

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use tracing_subscriber::{fmt, EnvFilter};

/// 请求级追踪标识。
#[derive(Debug, Clone)]
pub struct RequestIds {
    pub request_id: String,
    pub trace_id: String,
}

/// 进程指标快照。
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub polls_started: u64,
    pub polls_succeeded: u64,
    pub polls_failed: u64,
    pub scans_started: u64,
    pub scans_completed: u64,
    pub scans_failed: u64,
    pub events_published: u64,
    pub events_dropped: u64,
    pub subscribers_connected: u64,
    pub subscribers_disconnected: u64,
    pub minutely_reports: u64,
    pub push_success: u64,
    pub push_failure: u64,
}

/// 进程指标。
pub struct TelemetryMetrics {
    polls_started: AtomicU64,
    polls_succeeded: AtomicU64,
    polls_failed: AtomicU64,
    scans_started: AtomicU64,
    scans_completed: AtomicU64,
    scans_failed: AtomicU64,
    events_published: AtomicU64,
    events_dropped: AtomicU64,
    subscribers_connected: AtomicU64,
    subscribers_disconnected: AtomicU64,
    minutely_reports: AtomicU64,
    push_success: AtomicU64,
    push_failure: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            polls_started: AtomicU64::new(0),
            polls_succeeded: AtomicU64::new(0),
            polls_failed: AtomicU64::new(0),
            scans_started: AtomicU64::new(0),
            scans_completed: AtomicU64::new(0),
            scans_failed: AtomicU64::new(0),
            events_published: AtomicU64::new(0),
            events_dropped: AtomicU64::new(0),
            subscribers_connected: AtomicU64::new(0),
            subscribers_disconnected: AtomicU64::new(0),
            minutely_reports: AtomicU64::new(0),
            push_success: AtomicU64::new(0),
            push_failure: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            polls_started: self.polls_started.load(Ordering::Relaxed),
            polls_succeeded: self.polls_succeeded.load(Ordering::Relaxed),
            polls_failed: self.polls_failed.load(Ordering::Relaxed),
            scans_started: self.scans_started.load(Ordering::Relaxed),
            scans_completed: self.scans_completed.load(Ordering::Relaxed),
            scans_failed: self.scans_failed.load(Ordering::Relaxed),
            events_published: self.events_published.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            subscribers_connected: self.subscribers_connected.load(Ordering::Relaxed),
            subscribers_disconnected: self.subscribers_disconnected.load(Ordering::Relaxed),
            minutely_reports: self.minutely_reports.load(Ordering::Relaxed),
            push_success: self.push_success.load(Ordering::Relaxed),
            push_failure: self.push_failure.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 request_id 与 trace_id。
pub fn new_request_ids() -> RequestIds {
    RequestIds {
        request_id: uuid::Uuid::new_v4().to_string(),
        trace_id: uuid::Uuid::new_v4().to_string(),
    }
}

/// 记录轮询节拍启动次数。
pub fn record_poll_started() {
    metrics().polls_started.fetch_add(1, Ordering::Relaxed);
}

/// 记录单台设备轮询成功次数。
pub fn record_poll_succeeded() {
    metrics().polls_succeeded.fetch_add(1, Ordering::Relaxed);
}

/// 记录单台设备轮询失败次数。
pub fn record_poll_failed() {
    metrics().polls_failed.fetch_add(1, Ordering::Relaxed);
}

/// 记录扫描启动次数。
pub fn record_scan_started() {
    metrics().scans_started.fetch_add(1, Ordering::Relaxed);
}

/// 记录扫描完成次数。
pub fn record_scan_completed() {
    metrics().scans_completed.fetch_add(1, Ordering::Relaxed);
}

/// 记录扫描整体失败次数（ARP 表不可读等）。
pub fn record_scan_failed() {
    metrics().scans_failed.fetch_add(1, Ordering::Relaxed);
}

/// 记录事件发布次数（按订阅者投递计）。
pub fn record_event_published() {
    metrics().events_published.fetch_add(1, Ordering::Relaxed);
}

/// 记录因订阅者队列满而丢弃的事件次数。
pub fn record_event_dropped() {
    metrics().events_dropped.fetch_add(1, Ordering::Relaxed);
}

/// 记录订阅者接入次数。
pub fn record_subscriber_connected() {
    metrics()
        .subscribers_connected
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录订阅者断开次数。
pub fn record_subscriber_disconnected() {
    metrics()
        .subscribers_disconnected
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录分钟报文生成次数。
pub fn record_minutely_report() {
    metrics().minutely_reports.fetch_add(1, Ordering::Relaxed);
}

/// 记录推送成功次数。
pub fn record_push_success() {
    metrics().push_success.fetch_add(1, Ordering::Relaxed);
}

/// 记录推送失败次数。
pub fn record_push_failure() {
    metrics().push_failure.fetch_add(1, Ordering::Relaxed);
}
