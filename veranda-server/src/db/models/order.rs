//! Order Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{OrderStatus, PaymentMethod, ServiceType};
use surrealdb::RecordId;

use super::record_key;

/// 订单行 - 下单时刻的菜品快照
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderLine {
    /// 菜品 record key
    pub item: String,
    /// 菜品名称快照
    pub name: String,
    /// 单价快照
    pub price: Decimal,
    /// 数量
    pub quantity: i64,
    /// 行备注 (如 "no onions")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// 订单记录
///
/// `total` 在创建时固化；订单创建与库存预留绑定为一个原子单元。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    /// 客人 ID
    pub guest: String,
    /// 订单行
    pub items: Vec<OrderLine>,
    /// 合计快照
    pub total: Decimal,
    /// 履约方式
    pub service: ServiceType,
    /// 结算方式
    pub payment: PaymentMethod,
    /// 房号或桌号
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_or_table: Option<String>,
    /// 结算标记
    #[serde(default)]
    pub paid: bool,
    pub status: OrderStatus,
    /// 乐观并发版本号
    pub version: u64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Order {
    pub fn key(&self) -> String {
        record_key(&self.id)
    }
}

/// 创建订单所需的数据 (经理完成快照计算后填充)
#[derive(Debug, Clone)]
pub struct OrderCreate {
    pub guest: String,
    pub items: Vec<OrderLine>,
    pub total: Decimal,
    pub service: ServiceType,
    pub payment: PaymentMethod,
    pub room_or_table: Option<String>,
}

/// 对外暴露的订单视图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderView {
    pub id: String,
    pub guest: String,
    pub items: Vec<OrderLine>,
    pub total: Decimal,
    pub service: ServiceType,
    pub payment: PaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_or_table: Option<String>,
    pub paid: bool,
    pub status: OrderStatus,
    pub version: u64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<Order> for OrderView {
    fn from(o: Order) -> Self {
        let id = o.key();
        Self {
            id,
            guest: o.guest,
            items: o.items,
            total: o.total,
            service: o.service,
            payment: o.payment,
            room_or_table: o.room_or_table,
            paid: o.paid,
            status: o.status,
            version: o.version,
            created_at: o.created_at,
            updated_at: o.updated_at,
        }
    }
}
