//! Order API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use shared::{OrderStatus, PaymentMethod, ServiceType};
use validator::Validate;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::models::OrderView;
use crate::orders::{OrderDraft, OrderLineDraft};
use crate::utils::{AppResponse, AppResult, ok};

/// 订单行请求
#[derive(Debug, Deserialize, Validate)]
pub struct OrderLineRequest {
    /// 菜品 record key
    #[validate(length(min = 1, max = 64))]
    pub item: String,
    #[validate(range(min = 1, max = 99))]
    pub quantity: i64,
    #[validate(length(max = 200))]
    pub note: Option<String>,
}

/// 创建订单请求
///
/// 行数上限与服务矩阵由 [`crate::guard::InvariantGuard`] 检查。
#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[validate(nested)]
    pub lines: Vec<OrderLineRequest>,
    #[serde(default)]
    pub service: ServiceType,
    #[serde(default)]
    pub payment: PaymentMethod,
    #[validate(length(max = 32))]
    pub room_or_table: Option<String>,
}

/// 员工状态转移请求
#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

// =============================================================================
// Order Handlers
// =============================================================================

/// POST /api/orders - 创建订单 (含库存预留)
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(req): Json<CreateOrderRequest>,
) -> AppResult<Json<AppResponse<OrderView>>> {
    req.validate()?;

    let lines = req
        .lines
        .into_iter()
        .map(|l| OrderLineDraft {
            item: l.item,
            quantity: l.quantity,
            note: l.note,
        })
        .collect();

    let order = state
        .orders
        .create(
            &user,
            OrderDraft {
                lines,
                service: req.service,
                payment: req.payment,
                room_or_table: req.room_or_table,
            },
        )
        .await?;

    Ok(ok(order))
}

/// GET /api/orders - 列表 (客人看自己的, 员工看全部)
pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<AppResponse<Vec<OrderView>>>> {
    let orders = state.orders.list(&user).await?;
    Ok(ok(orders))
}

/// GET /api/orders/{id} - 读取单个订单
pub async fn get_by_id(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<AppResponse<OrderView>>> {
    let order = state.orders.get(&user, &id).await?;
    Ok(ok(order))
}

/// PUT /api/orders/{id}/status - 员工推进状态
pub async fn update_status(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateOrderStatusRequest>,
) -> AppResult<Json<AppResponse<OrderView>>> {
    let order = state.orders.update_status(&id, req.status).await?;
    Ok(ok(order))
}

/// POST /api/orders/{id}/cancel - 取消订单并回补库存
pub async fn cancel(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<AppResponse<OrderView>>> {
    let order = state.orders.cancel(&user, &id).await?;
    Ok(ok(order))
}
