//! 实时广播事件类型
//!
//! 服务端每接受一次状态转移就发布一条 [`UpdateEvent`]。投递按主题
//! 收窄：客人只收到自己名下实体的事件，员工控制台订阅统一的
//! Staff 主题，而不是全局广播后由接收端过滤。
//!
//! 投递语义为 at-most-once、尽力而为：连接断开期间的事件会丢失，
//! 消费者应把事件当作"刷新权威状态"的提示，而非唯一事实来源。

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::util::now_millis;

/// 广播主题
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// 单个客人的私有主题
    Guest(String),
    /// 员工控制台主题 (收到所有事件)
    Staff,
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Guest(id) => write!(f, "guest:{}", id),
            Topic::Staff => write!(f, "staff"),
        }
    }
}

/// 事件承载的实体类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    Booking,
    Order,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Booking => "booking",
            EntityKind::Order => "order",
        }
    }
}

/// 实体变更类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpdateAction {
    Created,
    StatusChanged,
}

/// 状态转移广播事件
///
/// `version` 按实体类型单调递增，客户端据此判断事件新旧；
/// `data` 携带完整的实体快照。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpdateEvent {
    /// 事件 ID (用于去重/追踪)
    pub event_id: Uuid,
    /// 实体类型
    pub kind: EntityKind,
    /// 变更类型
    pub action: UpdateAction,
    /// 实体 ID
    pub id: String,
    /// 所属客人 ID
    pub guest_id: String,
    /// 该实体类型下的单调版本号
    pub version: u64,
    /// 服务端时间戳 (毫秒)
    pub timestamp: i64,
    /// 实体完整快照
    pub data: serde_json::Value,
}

impl UpdateEvent {
    pub fn new(
        kind: EntityKind,
        action: UpdateAction,
        id: impl Into<String>,
        guest_id: impl Into<String>,
        version: u64,
        data: serde_json::Value,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            kind,
            action,
            id: id.into(),
            guest_id: guest_id.into(),
            version,
            timestamp: now_millis(),
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_display() {
        assert_eq!(Topic::Guest("g1".into()).to_string(), "guest:g1");
        assert_eq!(Topic::Staff.to_string(), "staff");
    }

    #[test]
    fn event_roundtrip() {
        let ev = UpdateEvent::new(
            EntityKind::Booking,
            UpdateAction::StatusChanged,
            "booking:abc",
            "guest-1",
            7,
            serde_json::json!({"status": "CONFIRMED"}),
        );
        let bytes = serde_json::to_vec(&ev).unwrap();
        let back: UpdateEvent = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, ev);
        assert_eq!(back.version, 7);
    }
}
