//! Stock Ledger
//!
//! # 扣减规则
//!
//! | 条件                        | 结果                          |
//! |-----------------------------|-------------------------------|
//! | 菜品不存在                  | 整单 THROW, 回滚              |
//! | `is_available = false`      | 整单 THROW, 回滚              |
//! | `quantity = NONE` (不限量)  | 通过, 不扣减                  |
//! | `quantity < 需求量`         | 整单 THROW, 回滚              |
//! | 扣减后归零                  | 自动下架并标记 `auto_disabled`|
//!
//! # 回补规则
//!
//! 只有 `auto_disabled` 的菜品在回补后重新上架；员工手动下架的
//! 菜品不受回补影响。回补时菜品已被删除则静默跳过。

use serde::Serialize;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use thiserror::Error;

/// 预留/释放的一行 (菜品 key + 数量)
#[derive(Debug, Clone, Serialize)]
pub struct ReserveLine {
    pub item: String,
    pub qty: i64,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Menu item not found: {0}")]
    NotFound(String),

    #[error("Menu item not available: {0}")]
    Unavailable(String),

    #[error("Insufficient stock for item: {0}")]
    Insufficient(String),

    #[error("Ledger database error: {0}")]
    Database(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

// THROW 标记, 后接出错菜品的 record key
const TAG_NOT_FOUND: &str = "stock_not_found:";
const TAG_UNAVAILABLE: &str = "stock_unavailable:";
const TAG_INSUFFICIENT: &str = "stock_insufficient:";

// =============================================================================
// Stock Ledger
// =============================================================================

#[derive(Clone)]
pub struct StockLedger {
    db: Surreal<Db>,
}

impl StockLedger {
    pub fn new(db: Surreal<Db>) -> Self {
        Self { db }
    }

    /// 为一组订单行预留库存 (全有或全无)
    ///
    /// 成功返回后所有受影响菜品的扣减已持久化；失败时没有任何
    /// 菜品被修改。
    pub async fn reserve(&self, lines: &[ReserveLine]) -> LedgerResult<()> {
        if lines.is_empty() {
            return Ok(());
        }

        let response = self
            .db
            .query(
                "
                BEGIN TRANSACTION;
                FOR $line IN $lines {
                    LET $found = (SELECT * FROM type::thing('menu_item', $line.item));
                    IF array::len($found) == 0 { THROW 'stock_not_found:' + $line.item };
                    LET $item = $found[0];
                    IF !$item.is_available { THROW 'stock_unavailable:' + $line.item };
                    IF $item.quantity != NONE {
                        IF $item.quantity < $line.qty { THROW 'stock_insufficient:' + $line.item };
                        LET $remaining = $item.quantity - $line.qty;
                        UPDATE $item.id SET
                            quantity = $remaining,
                            is_available = (IF $remaining <= 0 { false } ELSE { $item.is_available }),
                            auto_disabled = (IF $remaining <= 0 { true } ELSE { $item.auto_disabled });
                    };
                };
                COMMIT TRANSACTION;
                ",
            )
            .bind(("lines", lines.to_vec()))
            .await
            .map_err(|e| LedgerError::Database(e.to_string()))?;

        match response.check() {
            Ok(_) => Ok(()),
            Err(e) => Err(classify_throw(&e.to_string())),
        }
    }

    /// 释放先前预留的库存 (订单取消 / 创建补偿)
    ///
    /// 尽力而为地回补：菜品已被删除则跳过该行，其余行照常回补。
    pub async fn release(&self, lines: &[ReserveLine]) -> LedgerResult<()> {
        if lines.is_empty() {
            return Ok(());
        }

        let response = self
            .db
            .query(
                "
                BEGIN TRANSACTION;
                FOR $line IN $lines {
                    LET $found = (SELECT * FROM type::thing('menu_item', $line.item));
                    IF array::len($found) > 0 {
                        LET $item = $found[0];
                        IF $item.quantity != NONE {
                            LET $restocked = $item.quantity + $line.qty;
                            UPDATE $item.id SET
                                quantity = $restocked,
                                is_available = (IF $item.auto_disabled AND $restocked > 0 { true } ELSE { $item.is_available }),
                                auto_disabled = (IF $item.auto_disabled AND $restocked > 0 { false } ELSE { $item.auto_disabled });
                        };
                    };
                };
                COMMIT TRANSACTION;
                ",
            )
            .bind(("lines", lines.to_vec()))
            .await
            .map_err(|e| LedgerError::Database(e.to_string()))?;

        response
            .check()
            .map_err(|e| LedgerError::Database(e.to_string()))?;
        Ok(())
    }
}

/// 从事务 THROW 的错误文本还原出具体失败原因
fn classify_throw(msg: &str) -> LedgerError {
    if let Some(key) = extract_key(msg, TAG_NOT_FOUND) {
        return LedgerError::NotFound(key);
    }
    if let Some(key) = extract_key(msg, TAG_UNAVAILABLE) {
        return LedgerError::Unavailable(key);
    }
    if let Some(key) = extract_key(msg, TAG_INSUFFICIENT) {
        return LedgerError::Insufficient(key);
    }
    LedgerError::Database(msg.to_string())
}

fn extract_key(msg: &str, tag: &str) -> Option<String> {
    let start = msg.find(tag)? + tag.len();
    let rest = &msg[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_alphanumeric() && c != '_' && c != '-')
        .unwrap_or(rest.len());
    Some(rest[..end].to_string())
}
