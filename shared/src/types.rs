//! 预订与订单的状态机定义
//!
//! 状态转移的合法性判定集中在这里，服务端与客户端共用同一份
//! 规则，避免两侧各自维护一张转移表。
//!
//! # 预订状态机
//!
//! ```text
//! PendingVerification ──► Pending ──► Confirmed ──► CheckedIn ──► CheckedOut
//!         │                 │  │          │  │
//!         │                 │  └► Declined◄┘  └──────► (终态)
//!         └──────► Cancelled ◄──────┘
//! ```
//!
//! # 订单状态机
//!
//! ```text
//! Received ──► Preparing ──► Ready ──► Delivered ──► Completed
//!    │
//!    └──► Cancelled
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Booking Status
// ============================================================================

/// 预订状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    /// 等待邮件验证
    PendingVerification,
    /// 已验证，等待员工确认
    Pending,
    /// 员工已确认
    Confirmed,
    /// 已入住
    CheckedIn,
    /// 已退房 (终态)
    CheckedOut,
    /// 员工拒绝 (终态)
    Declined,
    /// 客人取消 (终态)
    Cancelled,
}

impl BookingStatus {
    /// 该状态是否占用客人的"唯一在途预订"名额
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            BookingStatus::PendingVerification
                | BookingStatus::Pending
                | BookingStatus::Confirmed
                | BookingStatus::CheckedIn
        )
    }

    /// 是否为终态 (不允许任何后续转移)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::CheckedOut | BookingStatus::Declined | BookingStatus::Cancelled
        )
    }

    /// 员工是否允许执行 `self -> to` 的转移
    ///
    /// 转移是接受或拒绝的，不存在"尽力而为"：不在表内的请求
    /// 一律拒绝且不修改存储状态。
    pub fn can_staff_transition_to(&self, to: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, to),
            (Pending, Confirmed)
                | (Pending, Declined)
                | (Confirmed, CheckedIn)
                | (Confirmed, Declined)
                | (CheckedIn, CheckedOut)
        )
    }

    /// 客人是否允许从该状态取消
    ///
    /// 入住之后不允许取消。
    pub fn can_guest_cancel(&self) -> bool {
        matches!(
            self,
            BookingStatus::PendingVerification | BookingStatus::Pending | BookingStatus::Confirmed
        )
    }

    /// 所有占用"在途预订"名额的状态 (用于数据库查询绑定)
    pub fn active_set() -> &'static [BookingStatus] {
        &[
            BookingStatus::PendingVerification,
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::CheckedIn,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::PendingVerification => "PENDING_VERIFICATION",
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::CheckedIn => "CHECKED_IN",
            BookingStatus::CheckedOut => "CHECKED_OUT",
            BookingStatus::Declined => "DECLINED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Order Status
// ============================================================================

/// 订单状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// 已接收
    Received,
    /// 制作中
    Preparing,
    /// 待取/待送
    Ready,
    /// 已送达
    Delivered,
    /// 已完成 (终态)
    Completed,
    /// 已取消 (终态)
    Cancelled,
}

impl OrderStatus {
    /// 该状态是否占用客人的"唯一在途订单"名额
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            OrderStatus::Received | OrderStatus::Preparing | OrderStatus::Ready
        )
    }

    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// 员工是否允许执行 `self -> to` 的转移
    ///
    /// 订单只能沿 Received → Preparing → Ready → Delivered → Completed
    /// 逐步前进；Delivered/Completed 不可回退。
    pub fn can_staff_transition_to(&self, to: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, to),
            (Received, Preparing) | (Preparing, Ready) | (Ready, Delivered) | (Delivered, Completed)
        )
    }

    /// 是否允许取消 (仅限尚未开始制作的订单)
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Received)
    }

    /// 所有占用"在途订单"名额的状态
    pub fn active_set() -> &'static [OrderStatus] {
        &[
            OrderStatus::Received,
            OrderStatus::Preparing,
            OrderStatus::Ready,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Received => "RECEIVED",
            OrderStatus::Preparing => "PREPARING",
            OrderStatus::Ready => "READY",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Service / Payment
// ============================================================================

/// 履约方式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceType {
    /// 堂食
    #[default]
    DineIn,
    /// 送至客房
    RoomDelivery,
}

/// 结算方式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// 餐厅现场支付
    #[default]
    PayAtRestaurant,
    /// 记入房账
    ChargeToRoom,
    /// 银行卡
    Card,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booking_staff_edges() {
        use BookingStatus::*;
        assert!(Pending.can_staff_transition_to(Confirmed));
        assert!(Pending.can_staff_transition_to(Declined));
        assert!(Confirmed.can_staff_transition_to(CheckedIn));
        assert!(Confirmed.can_staff_transition_to(Declined));
        assert!(CheckedIn.can_staff_transition_to(CheckedOut));

        // 不允许跳级: Pending 直接 CheckedIn
        assert!(!Pending.can_staff_transition_to(CheckedIn));
        // 终态无出边
        assert!(!CheckedOut.can_staff_transition_to(CheckedIn));
        assert!(!Declined.can_staff_transition_to(Pending));
        assert!(!Cancelled.can_staff_transition_to(Pending));
        // 验证转移不属于员工操作
        assert!(!PendingVerification.can_staff_transition_to(Pending));
    }

    #[test]
    fn booking_guest_cancel_window() {
        use BookingStatus::*;
        assert!(PendingVerification.can_guest_cancel());
        assert!(Pending.can_guest_cancel());
        assert!(Confirmed.can_guest_cancel());
        // 入住后不可取消
        assert!(!CheckedIn.can_guest_cancel());
        assert!(!CheckedOut.can_guest_cancel());
        assert!(!Cancelled.can_guest_cancel());
    }

    #[test]
    fn booking_active_set_matches_predicate() {
        for s in BookingStatus::active_set() {
            assert!(s.is_active());
            assert!(!s.is_terminal());
        }
        assert!(!BookingStatus::CheckedOut.is_active());
        assert!(BookingStatus::CheckedOut.is_terminal());
    }

    #[test]
    fn order_forward_only_chain() {
        use OrderStatus::*;
        assert!(Received.can_staff_transition_to(Preparing));
        assert!(Preparing.can_staff_transition_to(Ready));
        assert!(Ready.can_staff_transition_to(Delivered));
        assert!(Delivered.can_staff_transition_to(Completed));

        // Delivered/Completed 不可回退到制作阶段
        assert!(!Delivered.can_staff_transition_to(Preparing));
        assert!(!Delivered.can_staff_transition_to(Ready));
        assert!(!Completed.can_staff_transition_to(Delivered));
        assert!(!Completed.can_staff_transition_to(Received));
        // 不允许跳级
        assert!(!Received.can_staff_transition_to(Ready));
    }

    #[test]
    fn order_cancel_only_from_received() {
        use OrderStatus::*;
        assert!(Received.can_cancel());
        assert!(!Preparing.can_cancel());
        assert!(!Ready.can_cancel());
        assert!(!Delivered.can_cancel());
        assert!(!Completed.can_cancel());
    }

    #[test]
    fn status_serde_screaming_snake() {
        let s = serde_json::to_string(&BookingStatus::PendingVerification).unwrap();
        assert_eq!(s, "\"PENDING_VERIFICATION\"");
        let back: BookingStatus = serde_json::from_str(&s).unwrap();
        assert_eq!(back, BookingStatus::PendingVerification);

        let s = serde_json::to_string(&OrderStatus::Received).unwrap();
        assert_eq!(s, "\"RECEIVED\"");
    }
}
