//! Invariant Guard
//!
//! 跨实体业务规则的集中检查点。写路径的最终裁决仍由数据库事务
//! 做出 (见各 repository / ledger)，这里负责可以提前拒绝的部分，
//! 避免无谓的事务开销。
//!
//! # 履约 × 结算 矩阵
//!
//! | Service      | 要求                                  |
//! |--------------|---------------------------------------|
//! | DineIn       | 无前置要求                            |
//! | RoomDelivery | 必须有 CheckedIn 预订; 禁止现场支付   |
//! | ChargeToRoom | 必须有在途预订 (任意 active 状态)     |

use shared::{PaymentMethod, ServiceType};
use thiserror::Error;

use crate::db::models::Booking;
use crate::utils::AppError;

#[derive(Debug, Error)]
pub enum GuardError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),
}

impl From<GuardError> for AppError {
    fn from(e: GuardError) -> Self {
        match e {
            GuardError::Validation(msg) => AppError::Validation(msg),
            GuardError::Conflict(msg) => AppError::Conflict(msg),
        }
    }
}

pub type GuardResult = Result<(), GuardError>;

/// 业务不变量守卫 (无状态, 纯规则)
#[derive(Debug, Clone)]
pub struct InvariantGuard {
    max_order_lines: usize,
}

impl InvariantGuard {
    pub fn new(max_order_lines: usize) -> Self {
        Self { max_order_lines }
    }

    /// 预订创建的语义检查 (字段格式检查由 DTO 层的 validator 负责)
    pub fn check_booking_creation(&self, check_in: i64, check_out: i64, adults: u32) -> GuardResult {
        if check_in >= check_out {
            return Err(GuardError::Validation(
                "check_out must be after check_in".into(),
            ));
        }
        if adults == 0 {
            return Err(GuardError::Validation(
                "booking requires at least one adult".into(),
            ));
        }
        Ok(())
    }

    /// 订单行的结构检查
    pub fn check_order_lines(&self, line_count: usize, quantities: &[i64]) -> GuardResult {
        if line_count == 0 {
            return Err(GuardError::Validation(
                "order must contain at least one line".into(),
            ));
        }
        if line_count > self.max_order_lines {
            return Err(GuardError::Validation(format!(
                "order exceeds maximum of {} lines",
                self.max_order_lines
            )));
        }
        if quantities.iter().any(|&q| q < 1) {
            return Err(GuardError::Validation(
                "line quantity must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// 履约方式 × 结算方式 × 预订状态 的组合检查
    ///
    /// `booking` 为该客人当前的在途预订 (若有)。
    pub fn check_service_matrix(
        &self,
        service: ServiceType,
        payment: PaymentMethod,
        booking: Option<&Booking>,
    ) -> GuardResult {
        if service == ServiceType::RoomDelivery {
            let checked_in = booking
                .map(|b| b.status == shared::BookingStatus::CheckedIn)
                .unwrap_or(false);
            if !checked_in {
                return Err(GuardError::Conflict(
                    "room delivery requires a checked-in booking".into(),
                ));
            }
            if payment == PaymentMethod::PayAtRestaurant {
                return Err(GuardError::Validation(
                    "room delivery cannot be paid at the restaurant".into(),
                ));
            }
        }

        if payment == PaymentMethod::ChargeToRoom && booking.is_none() {
            return Err(GuardError::Conflict(
                "charge-to-room requires an active booking".into(),
            ));
        }

        Ok(())
    }
}
