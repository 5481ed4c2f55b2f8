//! 集成测试公共设施
//!
//! 每个测试用例拿到一个独立临时目录下的完整 ServerState
//! (RocksDB 落盘, 后台任务不启动)。

#![allow(dead_code)]

use rust_decimal::Decimal;
use tempfile::TempDir;
use veranda_server::auth::{CurrentUser, Role};
use veranda_server::bookings::manager::BookingDraft;
use veranda_server::db::models::MenuItemCreate;
use veranda_server::db::repository::MenuItemRepository;
use veranda_server::{Config, ServerState};

pub const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

pub async fn test_state() -> (ServerState, TempDir) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let config = Config::with_overrides(dir.path().to_string_lossy(), 0);
    let state = ServerState::initialize(&config)
        .await
        .expect("initialize server state");
    (state, dir)
}

pub fn guest(id: &str) -> CurrentUser {
    CurrentUser {
        id: id.to_string(),
        name: format!("Guest {id}"),
        role: Role::Guest,
    }
}

pub fn staff() -> CurrentUser {
    CurrentUser {
        id: "staff-1".to_string(),
        name: "Front Desk".to_string(),
        role: Role::Staff,
    }
}

/// 两晚的标准预订草稿 (房价 120/晚)
pub fn booking_draft() -> BookingDraft {
    let check_in = shared::util::now_millis() + MS_PER_DAY;
    BookingDraft {
        room: "101".to_string(),
        check_in,
        check_out: check_in + 2 * MS_PER_DAY,
        adults: 2,
        children: 0,
        contact_email: "guest@example.com".to_string(),
        room_rate: Decimal::from(120),
        extras_total: Decimal::ZERO,
        notes: None,
    }
}

/// 写入一个菜品, 返回 record key
pub async fn seed_item(
    state: &ServerState,
    name: &str,
    price: i64,
    quantity: Option<i64>,
) -> String {
    let repo = MenuItemRepository::new(state.db.db());
    let item = repo
        .create(MenuItemCreate {
            name: name.to_string(),
            price: Decimal::from(price),
            quantity,
        })
        .await
        .expect("create menu item");
    item.key()
}
