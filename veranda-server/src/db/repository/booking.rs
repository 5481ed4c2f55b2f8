//! Booking Repository
//!
//! "单客人唯一在途预订" 在插入事务内强制执行，而不是由读路径
//! 做咨询式检查：检查与插入之间不存在竞态窗口。

use shared::BookingStatus;
use shared::util::now_millis;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use super::{BaseRepository, RepoError, RepoResult, new_record_key};
use crate::db::models::{Booking, BookingCreate};

const BOOKING_TABLE: &str = "booking";

/// 插入事务中 THROW 的标记字符串
const ERR_ACTIVE_EXISTS: &str = "active_booking_exists";

// =============================================================================
// Booking Repository
// =============================================================================

#[derive(Clone)]
pub struct BookingRepository {
    base: BaseRepository,
}

impl BookingRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// 创建预订，同时在同一事务内强制 "单客人唯一在途预订"
    ///
    /// 事务内先查询该客人的在途预订，存在则 THROW 中止整个事务；
    /// 不存在则插入 PendingVerification 状态的新预订。
    pub async fn create_active(&self, data: BookingCreate) -> RepoResult<Booking> {
        let key = new_record_key();
        let now = now_millis();
        let booking = Booking {
            id: None,
            guest: data.guest.clone(),
            room: data.room,
            check_in: data.check_in,
            check_out: data.check_out,
            adults: data.adults,
            children: data.children,
            contact_email: data.contact_email,
            room_rate: data.room_rate,
            tax: data.tax,
            extras_total: data.extras_total,
            grand_total: data.grand_total,
            notes: data.notes,
            status: BookingStatus::PendingVerification,
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
                LET $existing = (SELECT VALUE id FROM booking WHERE guest = $guest AND status IN $active LIMIT 1);
                IF array::len($existing) > 0 { THROW 'active_booking_exists' };
                CREATE type::thing('booking', $key) CONTENT $data;
                COMMIT TRANSACTION;
                ",
            )
            .bind(("guest", data.guest))
            .bind(("active", BookingStatus::active_set().to_vec()))
            .bind(("key", key.clone()))
            .bind(("data", booking))
            .await?;

        if let Err(e) = response.check() {
            let msg = e.to_string();
            if msg.contains(ERR_ACTIVE_EXISTS) {
                return Err(RepoError::Conflict(
                    "guest already has an active booking".into(),
                ));
            }
            return Err(RepoError::Database(msg));
        }

        self.find_by_key(&key)
            .await?
            .ok_or_else(|| RepoError::Database("Failed to create booking".to_string()))
    }

    /// Find booking by record key
    pub async fn find_by_key(&self, key: &str) -> RepoResult<Option<Booking>> {
        let booking: Option<Booking> = self.base.db().select((BOOKING_TABLE, key)).await?;
        Ok(booking)
    }

    /// Find all bookings, newest first
    pub async fn find_all(&self) -> RepoResult<Vec<Booking>> {
        let bookings: Vec<Booking> = self
            .base
            .db()
            .query("SELECT * FROM booking ORDER BY created_at DESC")
            .await?
            .take(0)?;
        Ok(bookings)
    }

    /// Find all bookings belonging to a guest, newest first
    pub async fn find_by_guest(&self, guest: &str) -> RepoResult<Vec<Booking>> {
        let bookings: Vec<Booking> = self
            .base
            .db()
            .query("SELECT * FROM booking WHERE guest = $guest ORDER BY created_at DESC")
            .bind(("guest", guest.to_string()))
            .await?
            .take(0)?;
        Ok(bookings)
    }

    /// 查询客人的在途预订 (若有)
    pub async fn find_active_by_guest(&self, guest: &str) -> RepoResult<Option<Booking>> {
        let bookings: Vec<Booking> = self
            .base
            .db()
            .query("SELECT * FROM booking WHERE guest = $guest AND status IN $active LIMIT 1")
            .bind(("guest", guest.to_string()))
            .bind(("active", BookingStatus::active_set().to_vec()))
            .await?
            .take(0)?;
        Ok(bookings.into_iter().next())
    }

    /// 条件状态转移 (单条原子操作)
    ///
    /// 仅当存储中的状态和版本号与调用方读到的完全一致时才提交；
    /// 返回 `None` 表示输掉了竞争 (或记录不存在)，调用方应重读重试。
    pub async fn transition(
        &self,
        key: &str,
        from: BookingStatus,
        version: u64,
        to: BookingStatus,
    ) -> RepoResult<Option<Booking>> {
        let updated: Vec<Booking> = self
            .base
            .db()
            .query(
                "UPDATE type::thing('booking', $key) \
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

    /// 批量取消过期的 PendingVerification 预订 (清扫任务专用)
    ///
    /// 返回本次被取消的预订，供调用方逐条广播。
    pub async fn cancel_stale_pending_verification(
        &self,
        cutoff_ms: i64,
    ) -> RepoResult<Vec<Booking>> {
        let cancelled: Vec<Booking> = self
            .base
            .db()
            .query(
                "UPDATE booking \
                 SET status = $cancelled, version = version + 1, updated_at = $now \
                 WHERE status = $pending AND created_at < $cutoff \
                 RETURN AFTER",
            )
            .bind(("cancelled", BookingStatus::Cancelled))
            .bind(("pending", BookingStatus::PendingVerification))
            .bind(("cutoff", cutoff_ms))
            .bind(("now", now_millis()))
            .await?
            .take(0)?;
        Ok(cancelled)
    }
}
