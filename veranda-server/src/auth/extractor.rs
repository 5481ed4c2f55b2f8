//! CurrentUser Extractor
//!
//! handler 参数里的 `user: CurrentUser` 即触发此提取器。
//! 请求通常已经过 `require_auth` 中间件，此时直接复用扩展里的
//! 身份；公共路由上单独使用时则就地校验 Bearer 令牌。

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::AppError;
use crate::auth::{CurrentUser, JwtError, JwtService};
use crate::core::ServerState;
use crate::security_log;

impl FromRequestParts<ServerState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        // 中间件已认证过: 直接取扩展
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let user = authenticate(parts, state)?;
        // 回填扩展, 同一请求内的其他提取不再重复校验
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

fn authenticate(parts: &Parts, state: &ServerState) -> Result<CurrentUser, AppError> {
    let header = parts
        .headers
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let Some(header) = header else {
        security_log!("WARN", "auth_missing", uri = format!("{:?}", parts.uri));
        return Err(AppError::unauthorized());
    };

    let token = JwtService::extract_from_header(header)
        .ok_or_else(|| AppError::invalid_token("Invalid authorization header"))?;

    let claims = state.get_jwt_service().validate_token(token).map_err(|e| {
        security_log!(
            "WARN",
            "auth_failed",
            error = format!("{}", e),
            uri = format!("{:?}", parts.uri)
        );
        match e {
            JwtError::ExpiredToken => AppError::token_expired(),
            _ => AppError::invalid_token("Invalid token"),
        }
    })?;

    CurrentUser::try_from(claims)
        .map_err(|e| AppError::invalid_token(format!("Malformed JWT claims: {}", e)))
}
