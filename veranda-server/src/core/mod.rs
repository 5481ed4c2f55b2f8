//! 核心模块
//!
//! 配置、共享状态、HTTP 服务器与后台任务注册表。

pub mod config;
pub mod server;
pub mod state;
pub mod tasks;

pub use config::Config;
pub use server::Server;
pub use state::ServerState;
pub use tasks::{BackgroundTasks, TaskKind};
