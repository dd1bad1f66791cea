//! HTTP 响应辅助函数和 DTO 转换。

use api_contract::{ErrorResponse, PushStatus};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::time::format_local;
use fronius_push::{PushClientStatus, PushState};

/// 错误请求响应：`400 {success:false, error:"…"}`。
pub fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(message)),
    )
        .into_response()
}

/// 推送客户端状态块；三个环境值全缺省时状态接口不带 push 字段。
pub fn push_to_dto(status: PushClientStatus) -> Option<PushStatus> {
    if status.state == PushState::Absent {
        return None;
    }
    Some(PushStatus {
        configured: status.configured,
        enabled: status.enabled,
        state: status.state.as_str().to_string(),
        last_push_timestamp: status.last_push.map(format_local),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn response_json(response: Response) -> serde_json::Value {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn bad_request_contract() {
        let response = bad_request("Invalid action");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Invalid action");
    }

    #[test]
    fn absent_push_has_no_dto() {
        let status = PushClientStatus {
            configured: false,
            enabled: false,
            state: PushState::Absent,
            last_push: None,
        };
        assert!(push_to_dto(status).is_none());

        let disabled = PushClientStatus {
            configured: true,
            enabled: true,
            state: PushState::Disabled,
            last_push: None,
        };
        let dto = push_to_dto(disabled).expect("dto");
        assert_eq!(dto.state, "disabled");
        assert!(dto.last_push_timestamp.is_none());
    }
}
