//! Booking Manager
//!
//! 预订生命周期的编排层：组合守卫检查、金额快照、持久化、
//! 验证令牌签发、通知入队与广播。所有写路径最终落到
//! repository 的单条原子操作上。

use rust_decimal::Decimal;
use shared::BookingStatus;
use shared::message::{EntityKind, UpdateAction};
use tracing::{info, warn};

use crate::auth::CurrentUser;
use crate::broadcast::Broadcaster;
use crate::db::models::{BookingCreate, BookingView};
use crate::db::repository::BookingRepository;
use crate::guard::InvariantGuard;
use crate::notify::{DispatchHandle, VerificationEmail};
use crate::utils::{AppError, AppResult};

use super::verification::{VerificationGate, VerifyOutcome, VerifyTokenError};

/// 输掉条件更新竞争后的最大重读次数
const MAX_TRANSITION_RETRIES: u32 = 3;

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// 创建预订的输入 (handler 层完成字段校验后传入)
#[derive(Debug, Clone)]
pub struct BookingDraft {
    pub room: String,
    pub check_in: i64,
    pub check_out: i64,
    pub adults: u32,
    pub children: u32,
    pub contact_email: String,
    /// 每晚房价
    pub room_rate: Decimal,
    pub extras_total: Decimal,
    pub notes: Option<String>,
}

// =============================================================================
// Booking Manager
// =============================================================================

#[derive(Clone)]
pub struct BookingManager {
    repo: BookingRepository,
    gate: VerificationGate,
    broadcaster: Broadcaster,
    notifier: DispatchHandle,
    guard: InvariantGuard,
    tax_rate_percent: u32,
}

impl BookingManager {
    pub fn new(
        repo: BookingRepository,
        gate: VerificationGate,
        broadcaster: Broadcaster,
        notifier: DispatchHandle,
        guard: InvariantGuard,
        tax_rate_percent: u32,
    ) -> Self {
        Self {
            repo,
            gate,
            broadcaster,
            notifier,
            guard,
            tax_rate_percent,
        }
    }

    /// 创建预订
    ///
    /// 金额在此刻固化 (房价 × 晚数 + 税 + 附加项)；"单客人唯一
    /// 在途预订" 由 repository 的插入事务强制。成功后签发验证
    /// 令牌并入队通知。
    pub async fn create(&self, user: &CurrentUser, draft: BookingDraft) -> AppResult<BookingView> {
        self.guard
            .check_booking_creation(draft.check_in, draft.check_out, draft.adults)?;

        let stay_ms = draft.check_out - draft.check_in;
        let nights = (stay_ms.div_euclid(MS_PER_DAY) + (stay_ms.rem_euclid(MS_PER_DAY) != 0) as i64)
            .max(1);
        let room_total = draft.room_rate * Decimal::from(nights);
        let tax = room_total * Decimal::from(self.tax_rate_percent) / Decimal::from(100);
        let grand_total = room_total + tax + draft.extras_total;

        let booking = self
            .repo
            .create_active(BookingCreate {
                guest: user.id.clone(),
                room: draft.room,
                check_in: draft.check_in,
                check_out: draft.check_out,
                adults: draft.adults,
                children: draft.children,
                contact_email: draft.contact_email.clone(),
                room_rate: draft.room_rate,
                tax,
                extras_total: draft.extras_total,
                grand_total,
                notes: draft.notes,
            })
            .await?;

        let key = booking.key();
        let token = self
            .gate
            .issue(&key, &user.id)
            .map_err(|e| AppError::internal(format!("Failed to issue verification token: {e}")))?;

        self.notifier.enqueue(VerificationEmail {
            to: draft.contact_email,
            guest: user.id.clone(),
            booking_id: key.clone(),
            token,
        });

        info!(
            target: "bookings",
            booking = %key,
            guest = %user.id,
            grand_total = %grand_total,
            "Booking created, awaiting verification"
        );

        let view = BookingView::from(booking);
        self.publish(UpdateAction::Created, &view);
        Ok(view)
    }

    /// 消费验证令牌
    ///
    /// 幂等：重复点击同一链接返回 `AlreadyVerified` 与当前状态。
    /// 令牌对应的预订已被取消/拒绝时报冲突，而不是复活它。
    pub async fn verify(&self, token: &str) -> AppResult<VerifyOutcome> {
        let claims = match self.gate.decode(token) {
            Ok(claims) => claims,
            Err(VerifyTokenError::Expired) => return Ok(VerifyOutcome::Expired),
            Err(_) => return Ok(VerifyOutcome::Invalid),
        };

        for _ in 0..MAX_TRANSITION_RETRIES {
            let Some(booking) = self.repo.find_by_key(&claims.sub).await? else {
                return Ok(VerifyOutcome::Invalid);
            };

            match booking.status {
                BookingStatus::PendingVerification => {
                    let updated = self
                        .repo
                        .transition(
                            &claims.sub,
                            BookingStatus::PendingVerification,
                            booking.version,
                            BookingStatus::Pending,
                        )
                        .await?;

                    if let Some(updated) = updated {
                        info!(target: "bookings", booking = %claims.sub, "Booking verified");
                        let view = BookingView::from(updated);
                        self.publish(UpdateAction::StatusChanged, &view);
                        return Ok(VerifyOutcome::Verified { booking: view });
                    }
                    // 输掉竞争 (并发验证或清扫), 重读后按新状态处理
                }
                BookingStatus::Pending
                | BookingStatus::Confirmed
                | BookingStatus::CheckedIn
                | BookingStatus::CheckedOut => {
                    return Ok(VerifyOutcome::AlreadyVerified {
                        booking: BookingView::from(booking),
                    });
                }
                BookingStatus::Cancelled | BookingStatus::Declined => {
                    return Err(AppError::conflict(
                        "booking has been cancelled and can no longer be verified",
                    ));
                }
            }
        }

        Err(AppError::conflict(
            "booking is being modified concurrently, please retry",
        ))
    }

    /// 员工状态转移
    ///
    /// 合法性由状态机表裁定；并发修改通过条件更新线性化，
    /// 输掉竞争时重读重试，超出次数报冲突。
    pub async fn update_status(&self, key: &str, to: BookingStatus) -> AppResult<BookingView> {
        for _ in 0..MAX_TRANSITION_RETRIES {
            let booking = self
                .repo
                .find_by_key(key)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Booking not found: {key}")))?;

            if !booking.status.can_staff_transition_to(to) {
                return Err(AppError::conflict(format!(
                    "illegal transition: {} -> {}",
                    booking.status, to
                )));
            }

            let updated = self
                .repo
                .transition(key, booking.status, booking.version, to)
                .await?;

            if let Some(updated) = updated {
                info!(
                    target: "bookings",
                    booking = %key,
                    from = %booking.status,
                    to = %to,
                    "Booking status changed"
                );
                let view = BookingView::from(updated);
                self.publish(UpdateAction::StatusChanged, &view);
                return Ok(view);
            }

            warn!(target: "bookings", booking = %key, "Lost transition race, retrying");
        }

        Err(AppError::conflict(
            "booking is being modified concurrently, please retry",
        ))
    }

    /// 客人取消自己的预订 (员工也可代为取消)
    ///
    /// 入住之后不允许取消。
    pub async fn cancel(&self, user: &CurrentUser, key: &str) -> AppResult<BookingView> {
        for _ in 0..MAX_TRANSITION_RETRIES {
            let booking = self
                .repo
                .find_by_key(key)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Booking not found: {key}")))?;

            if !user.can_access_guest(&booking.guest) {
                return Err(AppError::forbidden("not your booking"));
            }

            if !booking.status.can_guest_cancel() {
                return Err(AppError::conflict(format!(
                    "booking cannot be cancelled from status {}",
                    booking.status
                )));
            }

            let updated = self
                .repo
                .transition(key, booking.status, booking.version, BookingStatus::Cancelled)
                .await?;

            if let Some(updated) = updated {
                info!(target: "bookings", booking = %key, guest = %booking.guest, "Booking cancelled");
                let view = BookingView::from(updated);
                self.publish(UpdateAction::StatusChanged, &view);
                return Ok(view);
            }
        }

        Err(AppError::conflict(
            "booking is being modified concurrently, please retry",
        ))
    }

    /// 读取单个预订 (客人只能看自己的)
    pub async fn get(&self, user: &CurrentUser, key: &str) -> AppResult<BookingView> {
        let booking = self
            .repo
            .find_by_key(key)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Booking not found: {key}")))?;

        if !user.can_access_guest(&booking.guest) {
            return Err(AppError::forbidden("not your booking"));
        }

        Ok(BookingView::from(booking))
    }

    /// 列表：员工看全部, 客人看自己的
    pub async fn list(&self, user: &CurrentUser) -> AppResult<Vec<BookingView>> {
        let bookings = if user.is_staff() {
            self.repo.find_all().await?
        } else {
            self.repo.find_by_guest(&user.id).await?
        };
        Ok(bookings.into_iter().map(BookingView::from).collect())
    }

    fn publish(&self, action: UpdateAction, view: &BookingView) {
        let data = serde_json::to_value(view).unwrap_or_default();
        self.broadcaster.publish(
            EntityKind::Booking,
            action,
            view.id.clone(),
            view.guest.clone(),
            data,
        );
    }
}
