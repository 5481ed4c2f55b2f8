//! Order API 模块

mod handler;

pub use handler::{CreateOrderRequest, OrderLineRequest, UpdateOrderStatusRequest};

use axum::middleware as axum_middleware;
use axum::{
    Router,
    routing::{get, post, put},
};

use crate::auth::require_staff;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", order_routes())
}

fn order_routes() -> Router<ServerState> {
    // 员工专属路由
    let staff = Router::new()
        .route("/{id}/status", put(handler::update_status))
        .route_layer(axum_middleware::from_fn(require_staff));

    Router::new()
        .route("/", post(handler::create).get(handler::list))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/cancel", post(handler::cancel))
        .merge(staff)
}
