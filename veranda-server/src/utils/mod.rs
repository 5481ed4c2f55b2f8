//! 工具模块
//!
//! - [`error`] - 统一错误类型与 API 响应
//! - [`logger`] - 日志初始化

pub mod error;
pub mod logger;

pub use error::{AppError, AppResponse, AppResult, ok, ok_with_message};
