//! Stock Ledger Module
//!
//! 订单路径的库存扣减与回补。全部修改在单个数据库事务内完成：
//! 任意一行失败则整单回滚，不存在部分扣减。

pub mod ledger;

pub use ledger::{LedgerError, ReserveLine, StockLedger};
