//! 动作触发 handlers
//!
//! - POST /api/do：`{action:"scan"}` 触发重扫并立即返回。

use crate::state::AppState;
use crate::utils::response::bad_request;
use api_contract::{DoRequest, DoResponse};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

pub async fn post_do(State(state): State<AppState>, Json(request): Json<DoRequest>) -> Response {
    match request.action.as_str() {
        "scan" => {
            state.collector.scan();
            (
                StatusCode::OK,
                Json(DoResponse {
                    success: true,
                    message: "Scan initiated".to_string(),
                }),
            )
                .into_response()
        }
        _ => bad_request("Invalid action"),
    }
}

#[cfg(test)]
mod tests {
    use crate::routes::create_api_router;
    use crate::state::AppState;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use fronius_collector::{Collector, CollectorOptions};
    use fronius_push::PushClient;
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    async fn test_app() -> axum::Router {
        let push = Arc::new(PushClient::from_values(None, None, None));
        let collector = Collector::start(CollectorOptions {
            site_name: "test-site".to_string(),
            poll_interval: Duration::from_secs(3600),
            push,
            initial_scan: false,
        })
        .expect("collector");
        create_api_router().with_state(AppState { collector })
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn unknown_action_is_rejected() {
        let app = test_app().await;
        let request = Request::builder()
            .method("POST")
            .uri("/api/do")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"action":"reboot"}"#))
            .expect("request");
        let response = app.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Invalid action");
    }

    #[tokio::test]
    async fn status_reports_cold_start_shape() {
        let app = test_app().await;
        let request = Request::builder()
            .uri("/api/status")
            .body(Body::empty())
            .expect("request");
        let response = app.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["deviceCount"], 0);
        assert!(json["lastScan"].is_null());
        assert!(json["devices"].as_array().expect("devices").is_empty());
        assert!(json["site"]["solar"]["powerW"].is_null());
        assert_eq!(json["site"]["hasFault"], false);
        // 推送未配置时不带 push 块
        assert!(json.get("push").map(|p| p.is_null()).unwrap_or(true));
    }

    #[tokio::test]
    async fn health_and_metrics_respond() {
        let app = test_app().await;
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert!(json.get("pollsStarted").is_some());
        assert!(json.get("eventsDropped").is_some());
    }
}
