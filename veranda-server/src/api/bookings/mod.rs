//! Booking API 模块

mod handler;

pub use handler::{CreateBookingRequest, UpdateBookingStatusRequest};

use axum::middleware as axum_middleware;
use axum::{
    Router,
    routing::{get, post, put},
};

use crate::auth::require_staff;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/bookings", booking_routes())
}

fn booking_routes() -> Router<ServerState> {
    // 员工专属路由
    let staff = Router::new()
        .route("/{id}/status", put(handler::update_status))
        .route_layer(axum_middleware::from_fn(require_staff));

    Router::new()
        // 列表: 客人看自己的, 员工看全部
        .route("/", post(handler::create).get(handler::list))
        // 公共路由 (require_auth 按路径放行)
        .route("/verify", get(handler::verify))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/cancel", post(handler::cancel))
        .merge(staff)
}
