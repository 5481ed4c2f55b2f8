//! Booking Lifecycle Module
//!
//! 预订的创建、邮件验证、员工状态转移与客人取消。
//! 转移合法性由 `shared::BookingStatus` 的状态机裁定，
//! 并发写入靠 repository 的条件更新线性化。

pub mod manager;
pub mod reaper;
pub mod verification;

pub use manager::BookingManager;
pub use reaper::Reaper;
pub use verification::{VerificationGate, VerifyOutcome};
