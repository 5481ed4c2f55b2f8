//! Database Module
//!
//! 嵌入式 SurrealDB (RocksDB 引擎) 初始化与表结构定义。

pub mod models;
pub mod repository;

use crate::utils::AppError;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, RocksDb};

const NAMESPACE: &str = "veranda";
const DATABASE: &str = "coordinator";

/// Database service — owns the embedded SurrealDB handle
#[derive(Clone)]
pub struct DbService {
    pub db: Surreal<Db>,
}

impl DbService {
    /// 打开 (或创建) 数据库并定义表结构
    pub async fn new(db_path: &str) -> Result<Self, AppError> {
        let db: Surreal<Db> = Surreal::new::<RocksDb>(db_path)
            .await
            .map_err(|e| AppError::database(format!("Failed to open database: {e}")))?;

        db.use_ns(NAMESPACE)
            .use_db(DATABASE)
            .await
            .map_err(|e| AppError::database(format!("Failed to select namespace: {e}")))?;

        define_schema(&db).await?;

        tracing::info!(path = %db_path, "Database connection established (SurrealDB/RocksDB)");

        Ok(Self { db })
    }

    pub fn db(&self) -> Surreal<Db> {
        self.db.clone()
    }
}

/// 定义表结构与索引 (幂等)
///
/// 表保持 SCHEMALESS；guest+status 复合索引支撑
/// "单客人在途预订/订单" 的活跃查询路径。
async fn define_schema(db: &Surreal<Db>) -> Result<(), AppError> {
    db.query(
        "
        DEFINE TABLE IF NOT EXISTS booking;
        DEFINE INDEX IF NOT EXISTS booking_guest_status ON booking FIELDS guest, status;
        DEFINE INDEX IF NOT EXISTS booking_status_created ON booking FIELDS status, created_at;

        DEFINE TABLE IF NOT EXISTS res_order;
        DEFINE INDEX IF NOT EXISTS res_order_guest_status ON res_order FIELDS guest, status;

        DEFINE TABLE IF NOT EXISTS menu_item;
        ",
    )
    .await
    .map_err(|e| AppError::database(format!("Failed to define schema: {e}")))?
    .check()
    .map_err(|e| AppError::database(format!("Failed to define schema: {e}")))?;

    Ok(())
}
