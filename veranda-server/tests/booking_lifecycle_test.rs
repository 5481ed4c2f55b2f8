//! 预订生命周期集成测试
//!
//! 覆盖创建金额快照、单客人唯一在途预订、验证幂等、员工状态机、
//! 取消规则与过期清扫。

mod common;

use common::{booking_draft, guest, staff, test_state};
use rust_decimal::Decimal;
use shared::BookingStatus;
use shared::message::{EntityKind, Topic, UpdateAction};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use veranda_server::AppError;
use veranda_server::bookings::{Reaper, VerificationGate, VerifyOutcome};
use veranda_server::db::repository::BookingRepository;

#[tokio::test]
async fn create_snapshots_money_and_starts_pending_verification() {
    let (state, _dir) = test_state().await;

    let booking = state
        .bookings
        .create(&guest("g1"), booking_draft())
        .await
        .unwrap();

    assert_eq!(booking.status, BookingStatus::PendingVerification);
    assert_eq!(booking.version, 0);
    // 2 晚 × 120 + 10% 税 = 264
    assert_eq!(booking.room_rate, Decimal::from(120));
    assert_eq!(booking.tax, Decimal::from(24));
    assert_eq!(booking.grand_total, Decimal::from(264));
}

#[tokio::test]
async fn one_active_booking_per_guest() {
    let (state, _dir) = test_state().await;

    state
        .bookings
        .create(&guest("g1"), booking_draft())
        .await
        .unwrap();

    // 同客人第二个预订被拒
    let err = state
        .bookings
        .create(&guest("g1"), booking_draft())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "got: {err:?}");

    // 其他客人不受影响
    state
        .bookings
        .create(&guest("g2"), booking_draft())
        .await
        .unwrap();
}

#[tokio::test]
async fn cancellation_frees_the_active_slot() {
    let (state, _dir) = test_state().await;
    let g1 = guest("g1");

    let booking = state.bookings.create(&g1, booking_draft()).await.unwrap();
    state.bookings.cancel(&g1, &booking.id).await.unwrap();

    // 取消后可以再订
    state.bookings.create(&g1, booking_draft()).await.unwrap();
}

#[tokio::test]
async fn verification_is_idempotent() {
    let (state, _dir) = test_state().await;
    let booking = state
        .bookings
        .create(&guest("g1"), booking_draft())
        .await
        .unwrap();

    let gate = VerificationGate::new(&state.config.jwt, 60);
    let token = gate.issue(&booking.id, "g1").unwrap();

    // 第一次: 验证生效
    match state.bookings.verify(&token).await.unwrap() {
        VerifyOutcome::Verified { booking } => {
            assert_eq!(booking.status, BookingStatus::Pending);
            assert_eq!(booking.version, 1);
        }
        other => panic!("expected Verified, got {other:?}"),
    }

    // 重放同一令牌: 幂等返回当前状态
    match state.bookings.verify(&token).await.unwrap() {
        VerifyOutcome::AlreadyVerified { booking } => {
            assert_eq!(booking.status, BookingStatus::Pending);
        }
        other => panic!("expected AlreadyVerified, got {other:?}"),
    }

    // 垃圾令牌
    assert!(matches!(
        state.bookings.verify("garbage").await.unwrap(),
        VerifyOutcome::Invalid
    ));
}

#[tokio::test]
async fn verify_after_cancellation_is_a_conflict() {
    let (state, _dir) = test_state().await;
    let g1 = guest("g1");
    let booking = state.bookings.create(&g1, booking_draft()).await.unwrap();

    let gate = VerificationGate::new(&state.config.jwt, 60);
    let token = gate.issue(&booking.id, "g1").unwrap();

    state.bookings.cancel(&g1, &booking.id).await.unwrap();

    // 取消后的预订不能被验证复活
    let err = state.bookings.verify(&token).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "got: {err:?}");
}

#[tokio::test]
async fn staff_state_machine_enforces_single_steps() {
    let (state, _dir) = test_state().await;
    let booking = state
        .bookings
        .create(&guest("g1"), booking_draft())
        .await
        .unwrap();

    // 未验证的预订不归员工管
    let err = state
        .bookings
        .update_status(&booking.id, BookingStatus::Confirmed)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let gate = VerificationGate::new(&state.config.jwt, 60);
    let token = gate.issue(&booking.id, "g1").unwrap();
    state.bookings.verify(&token).await.unwrap();

    // Pending 不能跳级到 CheckedIn
    let err = state
        .bookings
        .update_status(&booking.id, BookingStatus::CheckedIn)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // 合法链条
    for (to, expected_version) in [
        (BookingStatus::Confirmed, 2),
        (BookingStatus::CheckedIn, 3),
        (BookingStatus::CheckedOut, 4),
    ] {
        let updated = state.bookings.update_status(&booking.id, to).await.unwrap();
        assert_eq!(updated.status, to);
        assert_eq!(updated.version, expected_version);
    }

    // 终态无出边
    let err = state
        .bookings
        .update_status(&booking.id, BookingStatus::CheckedIn)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn cancel_rules_ownership_and_window() {
    let (state, _dir) = test_state().await;
    let g1 = guest("g1");
    let booking = state.bookings.create(&g1, booking_draft()).await.unwrap();

    // 别的客人不能取消
    let err = state
        .bookings
        .cancel(&guest("g2"), &booking.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    // 员工可以代为取消... 但先推进到 CheckedIn 再试
    let gate = VerificationGate::new(&state.config.jwt, 60);
    let token = gate.issue(&booking.id, "g1").unwrap();
    state.bookings.verify(&token).await.unwrap();
    state
        .bookings
        .update_status(&booking.id, BookingStatus::Confirmed)
        .await
        .unwrap();
    state
        .bookings
        .update_status(&booking.id, BookingStatus::CheckedIn)
        .await
        .unwrap();

    // 入住之后不可取消
    let err = state.bookings.cancel(&g1, &booking.id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "got: {err:?}");

    // 员工读取不受所有权限制
    let fetched = state.bookings.get(&staff(), &booking.id).await.unwrap();
    assert_eq!(fetched.status, BookingStatus::CheckedIn);

    // 客人看不到别人的预订
    let err = state
        .bookings
        .get(&guest("g2"), &booking.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn transitions_are_broadcast_to_staff_topic() {
    let (state, _dir) = test_state().await;
    let mut rx = state.broadcaster.subscribe(Topic::Staff);

    let booking = state
        .bookings
        .create(&guest("g1"), booking_draft())
        .await
        .unwrap();

    let created = rx.recv().await.unwrap();
    assert_eq!(created.kind, EntityKind::Booking);
    assert_eq!(created.action, UpdateAction::Created);
    assert_eq!(created.id, booking.id);
    assert_eq!(created.guest_id, "g1");

    let gate = VerificationGate::new(&state.config.jwt, 60);
    let token = gate.issue(&booking.id, "g1").unwrap();
    state.bookings.verify(&token).await.unwrap();

    let changed = rx.recv().await.unwrap();
    assert_eq!(changed.action, UpdateAction::StatusChanged);
    assert_eq!(changed.data["status"], "PENDING");
    assert!(changed.version > created.version);
}

#[tokio::test]
async fn reaper_cancels_stale_unverified_bookings() {
    let (state, _dir) = test_state().await;
    let booking = state
        .bookings
        .create(&guest("g1"), booking_draft())
        .await
        .unwrap();

    // 把创建时间拨回到 TTL 之外
    state
        .db
        .db()
        .query("UPDATE booking SET created_at = 0")
        .await
        .unwrap()
        .check()
        .unwrap();

    let reaper = Reaper::new(
        BookingRepository::new(state.db.db()),
        state.broadcaster.clone(),
        state.config.verification_ttl_minutes,
        Duration::from_secs(300),
        CancellationToken::new(),
    );
    reaper.sweep().await;

    let swept = state.bookings.get(&staff(), &booking.id).await.unwrap();
    assert_eq!(swept.status, BookingStatus::Cancelled);

    // 名额已释放
    state
        .bookings
        .create(&guest("g1"), booking_draft())
        .await
        .unwrap();
}
