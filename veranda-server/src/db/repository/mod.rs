//! Repository Module
//!
//! Provides persistence operations for the coordinator's SurrealDB tables.
//!
//! 所有状态修改都必须走条件更新 (`UPDATE ... WHERE status = $from AND
//! version = $version RETURN AFTER`) 或单个事务脚本 (`BEGIN TRANSACTION`
//! + `THROW` + `COMMIT TRANSACTION`)，禁止先读后写的两段式修改。

pub mod booking;
pub mod menu_item;
pub mod order;

pub use booking::BookingRepository;
pub use menu_item::MenuItemRepository;
pub use order::OrderRepository;

use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<surrealdb::Error> for RepoError {
    fn from(err: surrealdb::Error) -> Self {
        RepoError::Database(err.to_string())
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// 生成不带连字符的 record key (无需 ⟨⟩ 包裹，全栈可直接拼接)
pub fn new_record_key() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Base repository with database reference
#[derive(Clone)]
pub struct BaseRepository {
    db: Surreal<Db>,
}

impl BaseRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Surreal<Db> {
        &self.db
    }
}
