//! 认证模块
//!
//! 会话签发由外部的认证服务负责；协调器只校验 Bearer 令牌并
//! 区分 guest / staff 两种角色。

pub mod extractor;
pub mod jwt;
pub mod middleware;

pub use jwt::{Claims, JwtConfig, JwtError, JwtService};
pub use middleware::{require_auth, require_staff};

use serde::{Deserialize, Serialize};

/// 调用方角色
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// 住客
    Guest,
    /// 员工控制台
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::Staff => "staff",
        }
    }
}

/// 当前调用方身份 (从 JWT 提取)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// 用户 ID (guest id 或 staff id)
    pub id: String,
    /// 显示名
    pub name: String,
    /// 角色
    pub role: Role,
}

impl CurrentUser {
    pub fn is_staff(&self) -> bool {
        self.role == Role::Staff
    }

    /// 是否为指定客人本人或员工
    pub fn can_access_guest(&self, guest_id: &str) -> bool {
        self.is_staff() || self.id == guest_id
    }
}

impl TryFrom<Claims> for CurrentUser {
    type Error = JwtError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let role = match claims.role.as_str() {
            "guest" => Role::Guest,
            "staff" => Role::Staff,
            other => {
                return Err(JwtError::InvalidToken(format!("unknown role: {}", other)));
            }
        };
        Ok(Self {
            id: claims.sub,
            name: claims.name,
            role,
        })
    }
}
