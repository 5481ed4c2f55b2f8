//! Shared types for the Veranda platform
//!
//! 服务端与客户端共享的类型：预订/订单状态机、广播事件、
//! 以及通用工具函数。

pub mod message;
pub mod types;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use message::{EntityKind, Topic, UpdateAction, UpdateEvent};
pub use types::{BookingStatus, OrderStatus, PaymentMethod, ServiceType};
