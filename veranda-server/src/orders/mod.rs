//! Order Lifecycle Module
//!
//! 点餐订单的创建 (两阶段: 先预留库存再插入, 插入失败补偿回补)、
//! 员工状态推进与取消回补。

pub mod manager;

pub use manager::{OrderDraft, OrderLineDraft, OrderManager};
