//! Database Models

pub mod booking;
pub mod menu_item;
pub mod order;

pub use booking::{Booking, BookingCreate, BookingView};
pub use menu_item::{MenuItem, MenuItemCreate, MenuItemView};
pub use order::{Order, OrderCreate, OrderLine, OrderView};

use surrealdb::RecordId;

/// 提取 RecordId 的纯 key (API 对外只暴露 key 字符串)
pub fn record_key(id: &Option<RecordId>) -> String {
    id.as_ref()
        .map(|id| id.key().to_string())
        .unwrap_or_default()
}
