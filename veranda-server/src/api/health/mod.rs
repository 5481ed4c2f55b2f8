//! Health API 模块

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use shared::util::now_millis;

use crate::core::ServerState;
use crate::utils::{AppResponse, AppResult, ok};

#[derive(Debug, Serialize)]
pub struct HealthInfo {
    pub status: &'static str,
    pub version: &'static str,
    pub environment: String,
    pub timestamp: i64,
}

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/health", get(health))
}

/// GET /api/health - 存活检查 (公共路由)
async fn health(State(state): State<ServerState>) -> AppResult<Json<AppResponse<HealthInfo>>> {
    Ok(ok(HealthInfo {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.environment.clone(),
        timestamp: now_millis(),
    }))
}
