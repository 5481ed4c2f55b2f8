//! Verification Gate
//!
//! 新预订先停在 PendingVerification，客人点击邮件里的验证链接后
//! 才进入员工可见的 Pending 队列。验证令牌是独立类型的短时效
//! JWT，与访问令牌共用密钥但 `token_type` 不同，两边互不可用。

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::JwtConfig;
use crate::db::models::BookingView;

/// 验证令牌类型标识
pub const TOKEN_TYPE_VERIFICATION: &str = "booking_verification";

/// 验证令牌的 Claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationClaims {
    /// 预订 record key (Subject)
    pub sub: String,
    /// 所属客人 ID
    pub guest: String,
    /// 令牌类型
    pub token_type: String,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
    pub aud: String,
}

#[derive(Debug, Error)]
pub enum VerifyTokenError {
    #[error("Verification token expired")]
    Expired,

    #[error("Invalid verification token: {0}")]
    Invalid(String),

    #[error("Token generation failed: {0}")]
    GenerationFailed(String),
}

/// 验证结果 (直接序列化进 API 响应)
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerifyOutcome {
    /// 本次请求完成了验证
    Verified { booking: BookingView },
    /// 此前已验证过, 幂等返回当前状态
    AlreadyVerified { booking: BookingView },
    /// 令牌已过期 (对应预订会被清扫任务取消)
    Expired,
    /// 令牌无法解析或对应预订不存在
    Invalid,
}

// =============================================================================
// Verification Gate
// =============================================================================

#[derive(Clone)]
pub struct VerificationGate {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    ttl_minutes: i64,
}

impl VerificationGate {
    pub fn new(jwt: &JwtConfig, ttl_minutes: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(jwt.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt.secret.as_bytes()),
            issuer: jwt.issuer.clone(),
            audience: jwt.audience.clone(),
            ttl_minutes,
        }
    }

    pub fn ttl_minutes(&self) -> i64 {
        self.ttl_minutes
    }

    /// 为新建预订签发验证令牌
    pub fn issue(&self, booking_key: &str, guest: &str) -> Result<String, VerifyTokenError> {
        let now = Utc::now();
        let claims = VerificationClaims {
            sub: booking_key.to_string(),
            guest: guest.to_string(),
            token_type: TOKEN_TYPE_VERIFICATION.to_string(),
            exp: (now + Duration::minutes(self.ttl_minutes)).timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| VerifyTokenError::GenerationFailed(e.to_string()))
    }

    /// 解析并校验验证令牌
    pub fn decode(&self, token: &str) -> Result<VerificationClaims, VerifyTokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        let data = decode::<VerificationClaims>(token, &self.decoding_key, &validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => VerifyTokenError::Expired,
                _ => VerifyTokenError::Invalid(e.to_string()),
            },
        )?;

        if data.claims.token_type != TOKEN_TYPE_VERIFICATION {
            return Err(VerifyTokenError::Invalid(format!(
                "unexpected token type: {}",
                data.claims.token_type
            )));
        }

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{JwtService, Role};

    fn test_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-key-with-at-least-32-chars!".to_string(),
            expiration_minutes: 60,
            issuer: "veranda-server".to_string(),
            audience: "veranda-clients".to_string(),
        }
    }

    #[test]
    fn issue_and_decode() {
        let gate = VerificationGate::new(&test_config(), 60);
        let token = gate.issue("booking-key-1", "guest-1").unwrap();
        let claims = gate.decode(&token).unwrap();
        assert_eq!(claims.sub, "booking-key-1");
        assert_eq!(claims.guest, "guest-1");
        assert_eq!(claims.token_type, TOKEN_TYPE_VERIFICATION);
    }

    #[test]
    fn access_token_is_not_a_verification_token() {
        let config = test_config();
        let gate = VerificationGate::new(&config, 60);
        let svc = JwtService::with_config(config);

        // 同密钥签发的访问令牌不能通过验证闸口
        let access = svc.generate_token("guest-1", "Ana", Role::Guest).unwrap();
        assert!(matches!(
            gate.decode(&access),
            Err(VerifyTokenError::Invalid(_))
        ));

        // 反向同样不行
        let verification = gate.issue("b1", "guest-1").unwrap();
        assert!(svc.validate_token(&verification).is_err());
    }

    #[test]
    fn rejects_garbage_token() {
        let gate = VerificationGate::new(&test_config(), 60);
        assert!(matches!(
            gate.decode("garbage"),
            Err(VerifyTokenError::Invalid(_))
        ));
    }
}
