//! 应用运行配置加载。

use std::env;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 应用运行配置。
///
/// 三个 `LIVEONE_*` 值原样透传给推送客户端，由它执行校验语义
/// （全部缺省 = 客户端不存在；部分缺省或非法 = 配置错误并停用）。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_addr: String,
    pub port: u16,
    pub poll_interval_ms: u64,
    pub site_name: String,
    pub liveone_api_key: Option<String>,
    pub liveone_server: Option<String>,
    pub liveone_enabled: Option<String>,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = read_u16_with_default("PORT", 8080)?;
        let http_addr =
            env::var("FRONIUS_HTTP_ADDR").unwrap_or_else(|_| format!("0.0.0.0:{port}"));
        let poll_interval_ms = read_u64_with_default("FRONIUS_POLL_INTERVAL_MS", 2000)?;
        let site_name = env::var("FRONIUS_SITE_NAME").unwrap_or_else(|_| "fronius".to_string());
        let liveone_api_key = read_optional("LIVEONE_API_KEY");
        let liveone_server = read_optional("LIVEONE_SERVER");
        let liveone_enabled = read_optional("LIVEONE_ENABLED");

        Ok(Self {
            http_addr,
            port,
            poll_interval_ms,
            site_name,
            liveone_api_key,
            liveone_server,
            liveone_enabled,
        })
    }
}

/// 读取 u16 类型环境变量（缺省时使用默认值）。
fn read_u16_with_default(key: &str, default: u16) -> Result<u16, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u16>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u64_with_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}
