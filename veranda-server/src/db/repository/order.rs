//! Order Repository
//!
//! 与 Booking 同构："单客人唯一在途订单" 在插入事务内强制，
//! 状态转移走条件更新。表名用 `res_order` 以避开保留字 `order`。

use shared::OrderStatus;
use shared::util::now_millis;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use super::{BaseRepository, RepoError, RepoResult, new_record_key};
use crate::db::models::{Order, OrderCreate};

const ORDER_TABLE: &str = "res_order";

const ERR_ACTIVE_EXISTS: &str = "active_order_exists";

// =============================================================================
// Order Repository
// =============================================================================

#[derive(Clone)]
pub struct OrderRepository {
    base: BaseRepository,
}

impl OrderRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// 创建订单，事务内强制 "单客人唯一在途订单"
    ///
    /// 注意：库存预留发生在本调用之前 (两阶段)。本调用失败时
    /// 调用方必须执行补偿性的库存释放。
    pub async fn create_active(&self, data: OrderCreate) -> RepoResult<Order> {
        let key = new_record_key();
        let now = now_millis();
        let order = Order {
            id: None,
            guest: data.guest.clone(),
            items: data.items,
            total: data.total,
            service: data.service,
            payment: data.payment,
            room_or_table: data.room_or_table,
            paid: false,
            status: OrderStatus::Received,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        let response = self
            .base
            .db()
            .query(
                "
                BEGIN TRANSACTION;
                LET $existing = (SELECT VALUE id FROM res_order WHERE guest = $guest AND status IN $active LIMIT 1);
                IF array::len($existing) > 0 { THROW 'active_order_exists' };
                CREATE type::thing('res_order', $key) CONTENT $data;
                COMMIT TRANSACTION;
                ",
            )
            .bind(("guest", data.guest))
            .bind(("active", OrderStatus::active_set().to_vec()))
            .bind(("key", key.clone()))
            .bind(("data", order))
            .await?;

        if let Err(e) = response.check() {
            let msg = e.to_string();
            if msg.contains(ERR_ACTIVE_EXISTS) {
                return Err(RepoError::Conflict(
                    "guest already has an active order".into(),
                ));
            }
            return Err(RepoError::Database(msg));
        }

        self.find_by_key(&key)
            .await?
            .ok_or_else(|| RepoError::Database("Failed to create order".to_string()))
    }

    /// Find order by record key
    pub async fn find_by_key(&self, key: &str) -> RepoResult<Option<Order>> {
        let order: Option<Order> = self.base.db().select((ORDER_TABLE, key)).await?;
        Ok(order)
    }

    /// Find all orders, newest first
    pub async fn find_all(&self) -> RepoResult<Vec<Order>> {
        let orders: Vec<Order> = self
            .base
            .db()
            .query("SELECT * FROM res_order ORDER BY created_at DESC")
            .await?
            .take(0)?;
        Ok(orders)
    }

    /// Find all orders belonging to a guest, newest first
    pub async fn find_by_guest(&self, guest: &str) -> RepoResult<Vec<Order>> {
        let orders: Vec<Order> = self
            .base
            .db()
            .query("SELECT * FROM res_order WHERE guest = $guest ORDER BY created_at DESC")
            .bind(("guest", guest.to_string()))
            .await?
            .take(0)?;
        Ok(orders)
    }

    /// 查询客人的在途订单 (若有)
    pub async fn find_active_by_guest(&self, guest: &str) -> RepoResult<Option<Order>> {
        let orders: Vec<Order> = self
            .base
            .db()
            .query("SELECT * FROM res_order WHERE guest = $guest AND status IN $active LIMIT 1")
            .bind(("guest", guest.to_string()))
            .bind(("active", OrderStatus::active_set().to_vec()))
            .await?
            .take(0)?;
        Ok(orders.into_iter().next())
    }

    /// 条件状态转移，语义与 `BookingRepository::transition` 一致
    pub async fn transition(
        &self,
        key: &str,
        from: OrderStatus,
        version: u64,
        to: OrderStatus,
    ) -> RepoResult<Option<Order>> {
        let updated: Vec<Order> = self
            .base
            .db()
            .query(
                "UPDATE type::thing('res_order', $key) \
                 SET status = $to, version = version + 1, updated_at = $now \
                 WHERE status = $from AND version = $version \
                 RETURN AFTER",
            )
            .bind(("key", key.to_string()))
            .bind(("from", from))
            .bind(("to", to))
            .bind(("version", version))
            .bind(("now", now_millis()))
            .await?
            .take(0)?;
        Ok(updated.into_iter().next())
    }

}
