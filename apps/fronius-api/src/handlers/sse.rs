//! 事件流 handlers
//!
//! - GET /api/sse：连接注释 → 回放前奏 → 实时事件，30 秒心跳注释。
//!   订阅者断开即注销，队列里未投递的事件废弃。

use crate::state::AppState;
use axum::{
    extract::State,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
};
use futures::stream::{self, Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;

/// SSE 心跳注释间隔。
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

pub async fn get_sse(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let subscription = state.collector.subscribe().await;

    let connected = stream::iter([Ok(SseEvent::default().comment("connected"))]);
    let events = stream::unfold(subscription, |mut subscription| async move {
        subscription
            .recv()
            .await
            .map(|event| (Ok(to_sse_event(event)), subscription))
    });

    Sse::new(connected.chain(events))
        .keep_alive(KeepAlive::new().interval(HEARTBEAT_INTERVAL))
}

fn to_sse_event(event: domain::Event) -> SseEvent {
    SseEvent::default()
        .event(event.topic())
        .data(event.payload().to_string())
}
