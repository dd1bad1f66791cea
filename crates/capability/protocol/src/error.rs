//! 协议错误与故障码分类。

/// 协议错误。
///
/// 传输类错误会映射成设备故障码；`Shape` 是软失败（响应可解析为
/// JSON 但缺少期望结构），不产生故障码。
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("request timed out")]
    Timeout,
    #[error("connection refused")]
    ConnectionRefused,
    #[error("host unreachable")]
    HostUnreachable,
    #[error("http status {0}")]
    HttpStatus(u16),
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected response shape: {0}")]
    Shape(String),
    #[error("unknown error: {0}")]
    Unknown(String),
}

impl ProtocolError {
    /// 传输错误对应的故障码；软失败返回 None。
    pub fn fault_code(&self) -> Option<String> {
        match self {
            ProtocolError::Timeout => Some("TIMEOUT".to_string()),
            ProtocolError::ConnectionRefused => Some("CONNECTION_REFUSED".to_string()),
            ProtocolError::HostUnreachable => Some("HOST_UNREACHABLE".to_string()),
            ProtocolError::HttpStatus(code) => Some(format!("HTTP_{code}")),
            ProtocolError::Network(_) => Some("NETWORK_ERROR".to_string()),
            ProtocolError::Unknown(_) => Some("UNKNOWN_ERROR".to_string()),
            ProtocolError::Shape(_) => None,
        }
    }

    /// 按 reqwest 的错误类别分类。
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return ProtocolError::Timeout;
        }
        if let Some(status) = err.status() {
            return ProtocolError::HttpStatus(status.as_u16());
        }
        if err.is_connect() {
            if let Some(kind) = io_error_kind(&err) {
                if kind == std::io::ErrorKind::ConnectionRefused {
                    return ProtocolError::ConnectionRefused;
                }
            }
            let text = err.to_string();
            if text.contains("unreachable") {
                return ProtocolError::HostUnreachable;
            }
            return ProtocolError::Network(text);
        }
        if err.is_request() || err.is_body() {
            return ProtocolError::Network(err.to_string());
        }
        ProtocolError::Unknown(err.to_string())
    }
}

/// 在错误因果链里找底层 io 错误的类别。
fn io_error_kind(err: &reqwest::Error) -> Option<std::io::ErrorKind> {
    use std::error::Error as _;
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            return Some(io.kind());
        }
        source = cause.source();
    }
    None
}
