//! Menu Item Model
//!
//! 菜品目录由外部的目录管理负责；协调器只在下单/取消时
//! 通过库存台账修改 `quantity` 与可售状态。

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

use super::record_key;

/// 菜品 (可售商品)
///
/// 有效可售性 = `is_available && quantity.map_or(true, |q| q > 0)`。
/// `quantity` 为 None 表示不限量。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub name: String,
    pub price: Decimal,
    /// 手动可售开关 (员工维护)
    pub is_available: bool,
    /// 剩余数量; None = 不限量
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    /// 是否由台账在库存耗尽时自动下架
    ///
    /// 回补时只有 auto_disabled 的菜品会被自动重新上架，
    /// 员工手动下架的菜品不受回补影响。
    #[serde(default)]
    pub auto_disabled: bool,
    pub created_at: i64,
}

impl MenuItem {
    pub fn key(&self) -> String {
        record_key(&self.id)
    }

    /// 有效可售性
    pub fn is_effectively_available(&self) -> bool {
        self.is_available && self.quantity.is_none_or(|q| q > 0)
    }
}

/// 创建菜品所需的数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItemCreate {
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub quantity: Option<i64>,
}

/// 对外暴露的菜品视图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItemView {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    pub is_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    /// 有效可售性 (手动开关与库存的合成结果)
    pub effectively_available: bool,
}

impl From<MenuItem> for MenuItemView {
    fn from(m: MenuItem) -> Self {
        let id = m.key();
        let effectively_available = m.is_effectively_available();
        Self {
            id,
            name: m.name,
            price: m.price,
            is_available: m.is_available,
            quantity: m.quantity,
            effectively_available,
        }
    }
}
