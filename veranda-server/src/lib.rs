//! Veranda Server - 住宿平台预订与履约协调器
//!
//! # 架构概述
//!
//! 本模块是协调器的主入口，提供以下核心功能：
//!
//! - **预订生命周期** (`bookings`): 预订状态机、邮件验证门、过期清扫
//! - **订单生命周期** (`orders`): 客房送餐/堂食订单状态机
//! - **库存台账** (`stock`): 菜品库存的原子预留与回补
//! - **不变量守卫** (`guard`): 单在途预订/订单、行数上限、服务矩阵
//! - **事件广播** (`broadcast`): 按主题收窄的实时推送
//! - **数据库** (`db`): 嵌入式 SurrealDB 存储
//!
//! # 模块结构
//!
//! ```text
//! veranda-server/src/
//! ├── core/          # 配置、状态、服务器、后台任务
//! ├── auth/          # JWT 校验、调用方身份
//! ├── api/           # HTTP 路由和处理器
//! ├── db/            # 数据库层 (模型 + 仓储)
//! ├── stock/         # 库存台账
//! ├── guard/         # 不变量守卫
//! ├── bookings/      # 预订生命周期 + 验证门 + 清扫
//! ├── orders/        # 订单生命周期
//! ├── broadcast/     # 主题广播
//! ├── notify/        # 验证邮件外发 (outbox + 重试)
//! └── utils/         # 错误、日志
//! ```

pub mod api;
pub mod auth;
pub mod bookings;
pub mod broadcast;
pub mod core;
pub mod db;
pub mod guard;
pub mod notify;
pub mod orders;
pub mod stock;
pub mod utils;

// Re-export 公共类型
pub use auth::{CurrentUser, JwtService, Role};
pub use bookings::{BookingManager, VerificationGate, VerifyOutcome};
pub use broadcast::Broadcaster;
pub use core::{Config, Server, ServerState};
pub use guard::InvariantGuard;
pub use orders::OrderManager;
pub use stock::StockLedger;
pub use utils::{AppError, AppResponse, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

// Security logging macro - 支持 tracing 格式说明符
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

/// 设置运行环境 (dotenv + 日志)
pub fn setup_environment() -> std::io::Result<()> {
    let _ = dotenv::dotenv();
    let log_dir = std::env::var("LOG_DIR").ok();
    init_logger_with_file(
        std::env::var("LOG_LEVEL").ok().as_deref(),
        log_dir.as_deref(),
    );
    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
__   __                      _
\ \ / /__ _ _ __ _ _ _  __| |__ _
 \ V / -_) '_/ _` | ' \/ _` / _` |
  \_/\___|_| \__,_|_||_\__,_\__,_|
    "#
    );
}
