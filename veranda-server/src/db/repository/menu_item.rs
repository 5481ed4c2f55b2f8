//! Menu Item Repository
//!
//! 目录维护操作 (创建 / 手动上下架 / 设库存)。下单路径的扣减
//! 不走这里，见 `stock::StockLedger`。

use shared::util::now_millis;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use super::{BaseRepository, RepoResult, new_record_key};
use crate::db::models::{MenuItem, MenuItemCreate};

const MENU_ITEM_TABLE: &str = "menu_item";

// =============================================================================
// Menu Item Repository
// =============================================================================

#[derive(Clone)]
pub struct MenuItemRepository {
    base: BaseRepository,
}

impl MenuItemRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Create a menu item (available by default)
    pub async fn create(&self, data: MenuItemCreate) -> RepoResult<MenuItem> {
        let key = new_record_key();
        let item = MenuItem {
            id: None,
            name: data.name,
            price: data.price,
            is_available: true,
            quantity: data.quantity,
            auto_disabled: false,
            created_at: now_millis(),
        };

        let created: Option<MenuItem> = self
            .base
            .db()
            .create((MENU_ITEM_TABLE, key))
            .content(item)
            .await?;
        created.ok_or_else(|| super::RepoError::Database("Failed to create menu item".into()))
    }

    pub async fn find_by_key(&self, key: &str) -> RepoResult<Option<MenuItem>> {
        let item: Option<MenuItem> = self.base.db().select((MENU_ITEM_TABLE, key)).await?;
        Ok(item)
    }

    pub async fn find_all(&self) -> RepoResult<Vec<MenuItem>> {
        let items: Vec<MenuItem> = self
            .base
            .db()
            .query("SELECT * FROM menu_item ORDER BY name ASC")
            .await?
            .take(0)?;
        Ok(items)
    }

    /// 员工手动上下架
    ///
    /// 手动操作总是清掉 `auto_disabled`：此后该菜品的可售状态
    /// 归员工意志管，回补不再自动改动它。
    pub async fn set_availability(&self, key: &str, available: bool) -> RepoResult<Option<MenuItem>> {
        let updated: Vec<MenuItem> = self
            .base
            .db()
            .query(
                "UPDATE type::thing('menu_item', $key) \
                 SET is_available = $available, auto_disabled = false \
                 RETURN AFTER",
            )
            .bind(("key", key.to_string()))
            .bind(("available", available))
            .await?
            .take(0)?;
        Ok(updated.into_iter().next())
    }

    /// 员工直接设置库存量 (盘点 / 补货)
    pub async fn set_quantity(&self, key: &str, quantity: Option<i64>) -> RepoResult<Option<MenuItem>> {
        let updated: Vec<MenuItem> = self
            .base
            .db()
            .query(
                "UPDATE type::thing('menu_item', $key) \
                 SET quantity = $quantity \
                 RETURN AFTER",
            )
            .bind(("key", key.to_string()))
            .bind(("quantity", quantity))
            .await?
            .take(0)?;
        Ok(updated.into_iter().next())
    }
}
