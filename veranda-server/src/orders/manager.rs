//! Order Manager
//!
//! # 创建的两阶段结构
//!
//! ```text
//! 守卫检查 ──► ledger.reserve (事务) ──► repo.create_active (事务)
//!                                              │ 失败
//!                                              ▼
//!                                       ledger.release (补偿)
//! ```
//!
//! 库存预留和订单插入是两个独立事务：预留成功但插入失败
//! (典型原因是客人已有在途订单) 时必须回补，否则库存凭空蒸发。

use rust_decimal::Decimal;
use shared::OrderStatus;
use shared::message::{EntityKind, UpdateAction};
use shared::{PaymentMethod, ServiceType};
use tracing::{error, info, warn};

use crate::auth::CurrentUser;
use crate::broadcast::Broadcaster;
use crate::db::models::{OrderCreate, OrderLine, OrderView};
use crate::db::repository::{BookingRepository, MenuItemRepository, OrderRepository};
use crate::guard::InvariantGuard;
use crate::stock::{ReserveLine, StockLedger};
use crate::utils::{AppError, AppResult};

const MAX_TRANSITION_RETRIES: u32 = 3;

/// 创建订单的一行输入
#[derive(Debug, Clone)]
pub struct OrderLineDraft {
    /// 菜品 record key
    pub item: String,
    pub quantity: i64,
    pub note: Option<String>,
}

/// 创建订单的输入
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub lines: Vec<OrderLineDraft>,
    pub service: ServiceType,
    pub payment: PaymentMethod,
    pub room_or_table: Option<String>,
}

// =============================================================================
// Order Manager
// =============================================================================

#[derive(Clone)]
pub struct OrderManager {
    repo: OrderRepository,
    menu_repo: MenuItemRepository,
    booking_repo: BookingRepository,
    ledger: StockLedger,
    broadcaster: Broadcaster,
    guard: InvariantGuard,
}

impl OrderManager {
    pub fn new(
        repo: OrderRepository,
        menu_repo: MenuItemRepository,
        booking_repo: BookingRepository,
        ledger: StockLedger,
        broadcaster: Broadcaster,
        guard: InvariantGuard,
    ) -> Self {
        Self {
            repo,
            menu_repo,
            booking_repo,
            ledger,
            broadcaster,
            guard,
        }
    }

    /// 创建订单
    ///
    /// 名称与单价在此刻快照进订单行；`total` 固化后不再重算。
    pub async fn create(&self, user: &CurrentUser, draft: OrderDraft) -> AppResult<OrderView> {
        let quantities: Vec<i64> = draft.lines.iter().map(|l| l.quantity).collect();
        self.guard
            .check_order_lines(draft.lines.len(), &quantities)?;

        let active_booking = self.booking_repo.find_active_by_guest(&user.id).await?;
        self.guard
            .check_service_matrix(draft.service, draft.payment, active_booking.as_ref())?;

        // 菜品快照 (名称/单价以下单时刻为准)
        let mut items = Vec::with_capacity(draft.lines.len());
        for line in &draft.lines {
            let menu_item = self
                .menu_repo
                .find_by_key(&line.item)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Menu item not found: {}", line.item)))?;

            items.push(OrderLine {
                item: line.item.clone(),
                name: menu_item.name,
                price: menu_item.price,
                quantity: line.quantity,
                note: line.note.clone(),
            });
        }

        let total: Decimal = items
            .iter()
            .map(|l| l.price * Decimal::from(l.quantity))
            .sum();

        let reserve_lines: Vec<ReserveLine> = items
            .iter()
            .map(|l| ReserveLine {
                item: l.item.clone(),
                qty: l.quantity,
            })
            .collect();

        // 阶段 1: 预留库存 (全有或全无)
        self.ledger.reserve(&reserve_lines).await?;

        // 阶段 2: 插入订单; 失败则补偿回补
        let order = match self
            .repo
            .create_active(OrderCreate {
                guest: user.id.clone(),
                items,
                total,
                service: draft.service,
                payment: draft.payment,
                room_or_table: draft.room_or_table,
            })
            .await
        {
            Ok(order) => order,
            Err(e) => {
                if let Err(release_err) = self.ledger.release(&reserve_lines).await {
                    // 回补失败会造成库存偏低, 必须留痕供人工对账
                    error!(
                        target: "orders",
                        guest = %user.id,
                        error = %release_err,
                        "Compensating stock release failed after order insert failure"
                    );
                }
                return Err(e.into());
            }
        };

        info!(
            target: "orders",
            order = %order.key(),
            guest = %user.id,
            total = %total,
            "Order created"
        );

        let view = OrderView::from(order);
        self.publish(UpdateAction::Created, &view);
        Ok(view)
    }

    /// 员工推进订单状态 (只能沿链条单步前进)
    pub async fn update_status(&self, key: &str, to: OrderStatus) -> AppResult<OrderView> {
        for _ in 0..MAX_TRANSITION_RETRIES {
            let order = self
                .repo
                .find_by_key(key)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Order not found: {key}")))?;

            if !order.status.can_staff_transition_to(to) {
                return Err(AppError::conflict(format!(
                    "illegal transition: {} -> {}",
                    order.status, to
                )));
            }

            let updated = self
                .repo
                .transition(key, order.status, order.version, to)
                .await?;

            if let Some(updated) = updated {
                info!(
                    target: "orders",
                    order = %key,
                    from = %order.status,
                    to = %to,
                    "Order status changed"
                );
                let view = OrderView::from(updated);
                self.publish(UpdateAction::StatusChanged, &view);
                return Ok(view);
            }

            warn!(target: "orders", order = %key, "Lost transition race, retrying");
        }

        Err(AppError::conflict(
            "order is being modified concurrently, please retry",
        ))
    }

    /// 取消订单并回补库存
    ///
    /// 只有尚未开始制作 (Received) 的订单可以取消。先赢下
    /// Received → Cancelled 的条件转移, 赢了才回补：同一订单
    /// 不可能被回补两次。
    pub async fn cancel(&self, user: &CurrentUser, key: &str) -> AppResult<OrderView> {
        for _ in 0..MAX_TRANSITION_RETRIES {
            let order = self
                .repo
                .find_by_key(key)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Order not found: {key}")))?;

            if !user.can_access_guest(&order.guest) {
                return Err(AppError::forbidden("not your order"));
            }

            if !order.status.can_cancel() {
                return Err(AppError::conflict(format!(
                    "order cannot be cancelled from status {}",
                    order.status
                )));
            }

            let updated = self
                .repo
                .transition(key, order.status, order.version, OrderStatus::Cancelled)
                .await?;

            if let Some(updated) = updated {
                let reserve_lines: Vec<ReserveLine> = updated
                    .items
                    .iter()
                    .map(|l| ReserveLine {
                        item: l.item.clone(),
                        qty: l.quantity,
                    })
                    .collect();

                if let Err(e) = self.ledger.release(&reserve_lines).await {
                    error!(
                        target: "orders",
                        order = %key,
                        error = %e,
                        "Stock release failed after order cancellation"
                    );
                }

                info!(target: "orders", order = %key, guest = %order.guest, "Order cancelled");
                let view = OrderView::from(updated);
                self.publish(UpdateAction::StatusChanged, &view);
                return Ok(view);
            }
        }

        Err(AppError::conflict(
            "order is being modified concurrently, please retry",
        ))
    }

    /// 读取单个订单 (客人只能看自己的)
    pub async fn get(&self, user: &CurrentUser, key: &str) -> AppResult<OrderView> {
        let order = self
            .repo
            .find_by_key(key)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Order not found: {key}")))?;

        if !user.can_access_guest(&order.guest) {
            return Err(AppError::forbidden("not your order"));
        }

        Ok(OrderView::from(order))
    }

    /// 列表：员工看全部, 客人看自己的
    pub async fn list(&self, user: &CurrentUser) -> AppResult<Vec<OrderView>> {
        let orders = if user.is_staff() {
            self.repo.find_all().await?
        } else {
            self.repo.find_by_guest(&user.id).await?
        };
        Ok(orders.into_iter().map(OrderView::from).collect())
    }

    fn publish(&self, action: UpdateAction, view: &OrderView) {
        let data = serde_json::to_value(view).unwrap_or_default();
        self.broadcaster.publish(
            EntityKind::Order,
            action,
            view.id.clone(),
            view.guest.clone(),
            data,
        );
    }
}
