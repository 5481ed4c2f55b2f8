//! Event Subscription Handlers
//!
//! SSE 订阅端点。客人被钉死在自己的私有主题上 (query 参数被
//! 忽略)；员工默认订阅 Staff 主题，也可以指定某个客人的主题
//! 排查问题。

use std::convert::Infallible;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use serde::Deserialize;
use shared::message::Topic;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::auth::CurrentUser;
use crate::core::ServerState;

#[derive(Debug, Deserialize)]
pub struct SubscribeParams {
    /// 员工可选: 订阅指定客人的主题
    pub guest: Option<String>,
}

/// GET /api/events/subscribe - SSE 事件流
pub async fn subscribe(
    State(state): State<ServerState>,
    user: CurrentUser,
    Query(params): Query<SubscribeParams>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let topic = if user.is_staff() {
        match params.guest {
            Some(guest) => Topic::Guest(guest),
            None => Topic::Staff,
        }
    } else {
        // 客人只能订阅自己的主题
        Topic::Guest(user.id.clone())
    };

    debug!(user = %user.id, topic = %topic, "SSE subscription opened");
    let rx = state.broadcaster.subscribe(topic);

    let stream = futures::stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(update) => match Event::default().event("update").json_data(&update) {
                    Ok(event) => return Some((Ok::<_, Infallible>(event), rx)),
                    Err(e) => {
                        warn!(error = %e, "Failed to serialize update event, skipping");
                        continue;
                    }
                },
                // 落后于通道容量, 丢弃错过的事件继续 (消费者把事件当刷新提示)
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "SSE subscriber lagged, events dropped");
                    continue;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
