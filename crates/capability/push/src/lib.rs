//! LiveOne 推送客户端。
//!
//! 三个环境值全缺省时客户端静默不存在；只要设了任意一个，三个都
//! 必须齐全且合法，否则记配置错误并停用。401/404 会在进程剩余
//! 生命周期内停用客户端，避免持续敲打配置错误的端点。没有重试
//! 队列，错过的分钟就是错过了。

use chrono::{DateTime, Utc};
use domain::{MinutelyReport, PushTestResult};
use serde_json::Value;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{info, warn};

/// 自检 POST 超时。
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);
/// 分钟报文 POST 超时。
pub const STORE_TIMEOUT: Duration = Duration::from_secs(10);

/// 校验后的推送配置。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushConfig {
    pub api_key: String,
    pub server: String,
    pub enabled: bool,
}

impl PushConfig {
    /// 校验三个原始环境值。
    ///
    /// 全部缺省 → Ok(None)；部分缺省或非法 → Err(错误清单)。
    pub fn from_values(
        api_key: Option<String>,
        server: Option<String>,
        enabled: Option<String>,
    ) -> Result<Option<PushConfig>, Vec<String>> {
        if api_key.is_none() && server.is_none() && enabled.is_none() {
            return Ok(None);
        }

        let mut errors = Vec::new();
        let api_key = match api_key {
            Some(key) if key.starts_with("fr_") => Some(key),
            Some(_) => {
                errors.push("LIVEONE_API_KEY must start with fr_".to_string());
                None
            }
            None => {
                errors.push("LIVEONE_API_KEY is not set".to_string());
                None
            }
        };
        let server = match server {
            Some(url)
                if url.to_ascii_lowercase().starts_with("http://")
                    || url.to_ascii_lowercase().starts_with("https://") =>
            {
                Some(url)
            }
            Some(_) => {
                errors.push("LIVEONE_SERVER must start with http:// or https://".to_string());
                None
            }
            None => {
                errors.push("LIVEONE_SERVER is not set".to_string());
                None
            }
        };
        let enabled = match enabled.as_deref() {
            Some("true") => Some(true),
            Some("false") => Some(false),
            Some(_) => {
                errors.push("LIVEONE_ENABLED must be the literal true or false".to_string());
                None
            }
            None => {
                errors.push("LIVEONE_ENABLED is not set".to_string());
                None
            }
        };

        match (api_key, server, enabled) {
            (Some(api_key), Some(server), Some(enabled)) if errors.is_empty() => {
                Ok(Some(PushConfig {
                    api_key,
                    server,
                    enabled,
                }))
            }
            _ => Err(errors),
        }
    }

    /// 生效端点。
    pub fn endpoint(&self) -> String {
        format!("{}/api/push/fronius", self.server.trim_end_matches('/'))
    }
}

/// 客户端状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushState {
    /// 三个环境值都没设。
    Absent,
    /// 配置不完整或非法。
    ConfigError,
    /// 配置合法但 enabled=false。
    Off,
    /// 正常推送。
    Active,
    /// 因 401/404 在本进程内停用。
    Disabled,
}

impl PushState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PushState::Absent => "absent",
            PushState::ConfigError => "configError",
            PushState::Off => "off",
            PushState::Active => "active",
            PushState::Disabled => "disabled",
        }
    }
}

/// 状态接口用的只读状态块。
#[derive(Debug, Clone)]
pub struct PushClientStatus {
    pub configured: bool,
    pub enabled: bool,
    pub state: PushState,
    pub last_push: Option<DateTime<Utc>>,
}

/// 一次 store POST 的处理决策。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOutcome {
    /// 2xx 且 body.success=true：记录 lastPushTimestamp。
    Stored,
    /// 400：记日志后继续。
    BadRequest,
    /// 401/404：停用客户端。
    Disable(u16),
    /// 409：重复时间戳，按 info 记录后继续。
    Duplicate,
    /// 其余 5xx / 协议外状态：记日志后继续。
    Transient(u16),
}

/// 按响应状态与响应体分类处理决策。
pub fn classify_store_response(status: u16, body: &Value) -> StoreOutcome {
    match status {
        200..=299 => {
            if body.get("success").and_then(Value::as_bool) == Some(true) {
                StoreOutcome::Stored
            } else {
                StoreOutcome::Transient(status)
            }
        }
        400 => StoreOutcome::BadRequest,
        401 | 404 => StoreOutcome::Disable(status),
        409 => StoreOutcome::Duplicate,
        other => StoreOutcome::Transient(other),
    }
}

/// 推送客户端（进程级单例持有）。
pub struct PushClient {
    config: Option<PushConfig>,
    http: reqwest::Client,
    state: Mutex<PushState>,
    last_push: Mutex<Option<DateTime<Utc>>>,
    last_test: Mutex<Option<PushTestResult>>,
}

impl PushClient {
    /// 从原始环境值构造；配置错误只在这里记一次日志。
    pub fn from_values(
        api_key: Option<String>,
        server: Option<String>,
        enabled: Option<String>,
    ) -> Self {
        let (config, state) = match PushConfig::from_values(api_key, server, enabled) {
            Ok(None) => (None, PushState::Absent),
            Ok(Some(config)) => {
                let state = if config.enabled {
                    PushState::Active
                } else {
                    PushState::Off
                };
                (Some(config), state)
            }
            Err(errors) => {
                for error in &errors {
                    warn!(target: "fronius.push", error = %error, "push_config_invalid");
                }
                (None, PushState::ConfigError)
            }
        };
        if let Some(config) = &config {
            info!(
                target: "fronius.push",
                endpoint = %config.endpoint(),
                enabled = config.enabled,
                "push_client_configured"
            );
        }
        Self {
            config,
            http: reqwest::Client::new(),
            state: Mutex::new(state),
            last_push: Mutex::new(None),
            last_test: Mutex::new(None),
        }
    }

    pub fn state(&self) -> PushState {
        *lock(&self.state)
    }

    /// 是否应当发起推送。
    pub fn is_active(&self) -> bool {
        self.state() == PushState::Active
    }

    pub fn status(&self) -> PushClientStatus {
        PushClientStatus {
            configured: self.config.is_some(),
            enabled: self
                .config
                .as_ref()
                .map(|config| config.enabled)
                .unwrap_or(false),
            state: self.state(),
            last_push: *lock(&self.last_push),
        }
    }

    pub fn last_test(&self) -> Option<PushTestResult> {
        lock(&self.last_test).clone()
    }

    /// 启动自检：POST `{apiKey, action:"test"}`，结果作为 pushTest 事件载荷。
    /// 未激活时返回 None（不产生事件）。
    pub async fn self_test(&self) -> Option<PushTestResult> {
        if !self.is_active() {
            return None;
        }
        let config = self.config.as_ref()?;
        let body = serde_json::json!({
            "apiKey": config.api_key,
            "action": "test",
        });
        let result = self
            .http
            .post(config.endpoint())
            .timeout(TEST_TIMEOUT)
            .json(&body)
            .send()
            .await;

        let outcome = match result {
            Ok(response) => {
                let status = response.status().as_u16();
                let body: Value = response.json().await.unwrap_or(Value::Null);
                let success =
                    (200..300).contains(&status) && body.get("success").and_then(Value::as_bool) == Some(true);
                PushTestResult {
                    success,
                    message: body
                        .get("message")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .or_else(|| (!success).then(|| format!("HTTP {status}"))),
                    display_name: body
                        .get("displayName")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    timestamp: Utc::now(),
                }
            }
            Err(err) => PushTestResult {
                success: false,
                message: Some(classify_network_error(&err)),
                display_name: None,
                timestamp: Utc::now(),
            },
        };

        if outcome.success {
            info!(target: "fronius.push", "push_self_test_ok");
        } else {
            warn!(
                target: "fronius.push",
                message = outcome.message.as_deref().unwrap_or(""),
                "push_self_test_failed"
            );
        }
        *lock(&self.last_test) = Some(outcome.clone());
        Some(outcome)
    }

    /// 推送一条分钟报文：POST `{…report, apiKey, action:"store"}`。
    pub async fn push_report(&self, report: &MinutelyReport) {
        if !self.is_active() {
            return;
        }
        let Some(config) = self.config.as_ref() else {
            return;
        };
        let mut body = match serde_json::to_value(report) {
            Ok(Value::Object(map)) => map,
            _ => return,
        };
        body.insert("apiKey".to_string(), Value::String(config.api_key.clone()));
        body.insert("action".to_string(), Value::String("store".to_string()));

        let result = self
            .http
            .post(config.endpoint())
            .timeout(STORE_TIMEOUT)
            .json(&Value::Object(body))
            .send()
            .await;

        match result {
            Ok(response) => {
                let status = response.status().as_u16();
                let body: Value = response.json().await.unwrap_or(Value::Null);
                self.handle_store_response(status, &body, &report.sequence);
            }
            Err(err) => {
                fronius_telemetry::record_push_failure();
                warn!(
                    target: "fronius.push",
                    sequence = %report.sequence,
                    error = %classify_network_error(&err),
                    "push_store_failed"
                );
            }
        }
    }

    /// 按状态码落实推送策略（网络层之外的部分，独立出来便于测试）。
    pub fn handle_store_response(&self, status: u16, body: &Value, sequence: &str) {
        match classify_store_response(status, body) {
            StoreOutcome::Stored => {
                *lock(&self.last_push) = Some(Utc::now());
                fronius_telemetry::record_push_success();
                info!(target: "fronius.push", sequence, "push_stored");
            }
            StoreOutcome::BadRequest => {
                fronius_telemetry::record_push_failure();
                warn!(target: "fronius.push", sequence, "push_rejected_bad_request");
            }
            StoreOutcome::Disable(status) => {
                fronius_telemetry::record_push_failure();
                *lock(&self.state) = PushState::Disabled;
                warn!(
                    target: "fronius.push",
                    sequence,
                    status,
                    "push_client_disabled_for_process_lifetime"
                );
            }
            StoreOutcome::Duplicate => {
                info!(target: "fronius.push", sequence, "push_duplicate_timestamp");
            }
            StoreOutcome::Transient(status) => {
                fronius_telemetry::record_push_failure();
                warn!(target: "fronius.push", sequence, status, "push_store_transient_failure");
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// 网络错误分类：dns、拒绝连接、超时或其他。
fn classify_network_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        return "timeout".to_string();
    }
    use std::error::Error as _;
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string().to_ascii_lowercase();
        if text.contains("dns") {
            return "dns error".to_string();
        }
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::ConnectionRefused {
                return "connection refused".to_string();
            }
        }
        source = cause.source();
    }
    format!("network error: {err}")
}
