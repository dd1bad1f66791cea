//! 路由定义
//!
//! - 健康检查：/health
//! - 进程指标：/metrics
//! - 状态查询：/api/status
//! - 动作触发：/api/do（目前只有 scan）
//! - 事件流：/api/sse
//! - 滚动历史：/api/history

use crate::handlers::*;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

/// 创建 API 路由。
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(get_metrics))
        .route("/api/status", get(get_status))
        .route("/api/do", post(post_do))
        .route("/api/sse", get(get_sse))
        .route("/api/history", get(get_history))
}
