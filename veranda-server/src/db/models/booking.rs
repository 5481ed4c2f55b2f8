//! Booking Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::BookingStatus;
use surrealdb::RecordId;

use super::record_key;

/// 预订记录
///
/// 金额字段在创建时一次性计算并固化，之后不再重算。
/// 预订永不物理删除：取消/拒绝是状态，不是删除。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    /// 客人 ID
    pub guest: String,
    /// 房间 ID
    pub room: String,
    /// 入住时间 (毫秒时间戳)
    pub check_in: i64,
    /// 退房时间 (毫秒时间戳)
    pub check_out: i64,
    /// 成人数量
    pub adults: u32,
    /// 儿童数量
    #[serde(default)]
    pub children: u32,
    /// 验证邮件送达地址
    pub contact_email: String,
    /// 每晚房价快照
    pub room_rate: Decimal,
    /// 税费快照
    pub tax: Decimal,
    /// 附加项费用快照
    pub extras_total: Decimal,
    /// 合计快照
    pub grand_total: Decimal,
    /// 客人备注
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub status: BookingStatus,
    /// 乐观并发版本号，每次被接受的转移 +1
    pub version: u64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Booking {
    /// 数据库 record key (不含表前缀)
    pub fn key(&self) -> String {
        record_key(&self.id)
    }
}

/// 创建预订所需的数据 (经理计算金额快照后填充)
#[derive(Debug, Clone)]
pub struct BookingCreate {
    pub guest: String,
    pub room: String,
    pub check_in: i64,
    pub check_out: i64,
    pub adults: u32,
    pub children: u32,
    pub contact_email: String,
    pub room_rate: Decimal,
    pub tax: Decimal,
    pub extras_total: Decimal,
    pub grand_total: Decimal,
    pub notes: Option<String>,
}

/// 对外暴露的预订视图 (id 为纯字符串)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingView {
    pub id: String,
    pub guest: String,
    pub room: String,
    pub check_in: i64,
    pub check_out: i64,
    pub adults: u32,
    pub children: u32,
    pub room_rate: Decimal,
    pub tax: Decimal,
    pub extras_total: Decimal,
    pub grand_total: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub status: BookingStatus,
    pub version: u64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<Booking> for BookingView {
    fn from(b: Booking) -> Self {
        let id = b.key();
        Self {
            id,
            guest: b.guest,
            room: b.room,
            check_in: b.check_in,
            check_out: b.check_out,
            adults: b.adults,
            children: b.children,
            room_rate: b.room_rate,
            tax: b.tax,
            extras_total: b.extras_total,
            grand_total: b.grand_total,
            notes: b.notes,
            status: b.status,
            version: b.version,
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}
