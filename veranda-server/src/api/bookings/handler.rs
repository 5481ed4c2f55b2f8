//! Booking API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::BookingStatus;
use validator::Validate;

use crate::auth::CurrentUser;
use crate::bookings::VerifyOutcome;
use crate::bookings::manager::BookingDraft;
use crate::core::ServerState;
use crate::db::models::BookingView;
use crate::utils::{AppResponse, AppResult, ok, ok_with_message};

/// 创建预订请求
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookingRequest {
    #[validate(length(min = 1, max = 64))]
    pub room: String,
    /// 入住时间 (毫秒时间戳)
    pub check_in: i64,
    /// 退房时间 (毫秒时间戳)
    pub check_out: i64,
    #[validate(range(min = 1, max = 16))]
    pub adults: u32,
    #[serde(default)]
    #[validate(range(max = 16))]
    pub children: u32,
    #[validate(email)]
    pub contact_email: String,
    /// 每晚房价
    pub room_rate: Decimal,
    /// 附加项费用
    #[serde(default)]
    pub extras_total: Decimal,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

/// 员工状态转移请求
#[derive(Debug, Deserialize)]
pub struct UpdateBookingStatusRequest {
    pub status: BookingStatus,
}

#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    pub token: String,
}

// =============================================================================
// Booking Handlers
// =============================================================================

/// POST /api/bookings - 创建预订
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(req): Json<CreateBookingRequest>,
) -> AppResult<Json<AppResponse<BookingView>>> {
    req.validate()?;

    let booking = state
        .bookings
        .create(
            &user,
            BookingDraft {
                room: req.room,
                check_in: req.check_in,
                check_out: req.check_out,
                adults: req.adults,
                children: req.children,
                contact_email: req.contact_email,
                room_rate: req.room_rate,
                extras_total: req.extras_total,
                notes: req.notes,
            },
        )
        .await?;

    Ok(ok_with_message(
        booking,
        "Booking created, check your email to verify",
    ))
}

/// GET /api/bookings/verify?token= - 消费验证令牌 (公共路由, 幂等)
pub async fn verify(
    State(state): State<ServerState>,
    Query(params): Query<VerifyParams>,
) -> AppResult<Json<AppResponse<VerifyOutcome>>> {
    let outcome = state.bookings.verify(&params.token).await?;
    Ok(ok(outcome))
}

/// GET /api/bookings - 列表 (客人看自己的, 员工看全部)
pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<AppResponse<Vec<BookingView>>>> {
    let bookings = state.bookings.list(&user).await?;
    Ok(ok(bookings))
}

/// GET /api/bookings/{id} - 读取单个预订
pub async fn get_by_id(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<AppResponse<BookingView>>> {
    let booking = state.bookings.get(&user, &id).await?;
    Ok(ok(booking))
}

/// PUT /api/bookings/{id}/status - 员工状态转移
pub async fn update_status(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateBookingStatusRequest>,
) -> AppResult<Json<AppResponse<BookingView>>> {
    let booking = state.bookings.update_status(&id, req.status).await?;
    Ok(ok(booking))
}

/// POST /api/bookings/{id}/cancel - 客人取消
pub async fn cancel(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<AppResponse<BookingView>>> {
    let booking = state.bookings.cancel(&user, &id).await?;
    Ok(ok(booking))
}
