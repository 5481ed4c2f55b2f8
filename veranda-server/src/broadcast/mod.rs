//! Topic-Scoped Broadcaster
//!
//! 每个主题一条独立的 tokio broadcast 通道，按需惰性创建。
//! 发布是尽力而为的：主题无订阅者时事件直接丢弃，客人主题还会
//! 顺手回收通道，避免断连客人的通道永久驻留。
//!
//! ```text
//!                    ┌──────────────────┐
//!  publish ─────────►│  Guest("g1") ch  │────► 该客人的 SSE 连接
//!     │              └──────────────────┘
//!     │              ┌──────────────────┐
//!     └─────────────►│    Staff ch      │────► 所有员工控制台
//!                    └──────────────────┘
//! ```

use dashmap::DashMap;
use serde_json::Value;
use shared::message::{EntityKind, Topic, UpdateAction, UpdateEvent};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::debug;

/// 默认通道容量 (慢消费者滞后超过容量会收到 Lagged)
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct Broadcaster {
    inner: Arc<BroadcasterInner>,
}

struct BroadcasterInner {
    channels: DashMap<Topic, broadcast::Sender<UpdateEvent>>,
    /// 按实体类型单调递增的事件版本号
    versions: DashMap<EntityKind, AtomicU64>,
    capacity: usize,
}

impl Broadcaster {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(BroadcasterInner {
                channels: DashMap::new(),
                versions: DashMap::new(),
                capacity,
            }),
        }
    }

    /// 订阅一个主题，通道不存在时惰性创建
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<UpdateEvent> {
        self.inner
            .channels
            .entry(topic)
            .or_insert_with(|| broadcast::channel(self.inner.capacity).0)
            .subscribe()
    }

    /// 发布实体变更：投递到所属客人的私有主题与 Staff 主题
    ///
    /// 返回分配给该事件的版本号。
    pub fn publish(
        &self,
        kind: EntityKind,
        action: UpdateAction,
        id: impl Into<String>,
        guest_id: impl Into<String>,
        data: Value,
    ) -> u64 {
        let version = self.next_version(kind);
        let guest_id = guest_id.into();
        let event = UpdateEvent::new(kind, action, id, guest_id.clone(), version, data);

        self.send_to(Topic::Guest(guest_id), event.clone());
        self.send_to(Topic::Staff, event);

        version
    }

    /// 当前某实体类型已分配到的最大版本号
    pub fn current_version(&self, kind: EntityKind) -> u64 {
        self.inner
            .versions
            .get(&kind)
            .map(|v| v.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    fn next_version(&self, kind: EntityKind) -> u64 {
        self.inner
            .versions
            .entry(kind)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::SeqCst)
            + 1
    }

    fn send_to(&self, topic: Topic, event: UpdateEvent) {
        let Some(sender) = self.inner.channels.get(&topic).map(|s| s.value().clone()) else {
            return;
        };

        if sender.send(event).is_err() {
            // 无订阅者; 客人主题顺手回收, Staff 主题常驻
            if matches!(topic, Topic::Guest(_)) && sender.receiver_count() == 0 {
                debug!(topic = %topic, "Pruning idle broadcast channel");
                self.inner
                    .channels
                    .remove_if(&topic, |_, s| s.receiver_count() == 0);
            }
        }
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn guest_topics_are_isolated() {
        let bus = Broadcaster::default();
        let mut rx_g1 = bus.subscribe(Topic::Guest("g1".into()));
        let mut rx_g2 = bus.subscribe(Topic::Guest("g2".into()));

        bus.publish(
            EntityKind::Booking,
            UpdateAction::Created,
            "b1",
            "g1",
            json!({}),
        );

        let ev = rx_g1.recv().await.unwrap();
        assert_eq!(ev.guest_id, "g1");
        assert!(rx_g2.try_recv().is_err());
    }

    #[tokio::test]
    async fn staff_topic_sees_all_guests() {
        let bus = Broadcaster::default();
        let mut rx_staff = bus.subscribe(Topic::Staff);

        bus.publish(
            EntityKind::Booking,
            UpdateAction::Created,
            "b1",
            "g1",
            json!({}),
        );
        bus.publish(
            EntityKind::Order,
            UpdateAction::Created,
            "o1",
            "g2",
            json!({}),
        );

        assert_eq!(rx_staff.recv().await.unwrap().guest_id, "g1");
        assert_eq!(rx_staff.recv().await.unwrap().guest_id, "g2");
    }

    #[tokio::test]
    async fn versions_are_monotonic_per_kind() {
        let bus = Broadcaster::default();
        let v1 = bus.publish(
            EntityKind::Booking,
            UpdateAction::Created,
            "b1",
            "g1",
            json!({}),
        );
        let v2 = bus.publish(
            EntityKind::Booking,
            UpdateAction::StatusChanged,
            "b1",
            "g1",
            json!({}),
        );
        // 订单的版本序列独立于预订
        let o1 = bus.publish(
            EntityKind::Order,
            UpdateAction::Created,
            "o1",
            "g1",
            json!({}),
        );

        assert_eq!(v1, 1);
        assert_eq!(v2, 2);
        assert_eq!(o1, 1);
        assert_eq!(bus.current_version(EntityKind::Booking), 2);
        assert_eq!(bus.current_version(EntityKind::Order), 1);
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_silent() {
        let bus = Broadcaster::default();
        // 不应 panic, 也不应阻塞
        bus.publish(
            EntityKind::Booking,
            UpdateAction::Created,
            "b1",
            "g-nobody",
            json!({}),
        );
        assert_eq!(bus.current_version(EntityKind::Booking), 1);
    }
}
