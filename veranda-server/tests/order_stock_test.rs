//! 订单与库存台账集成测试
//!
//! 覆盖金额/菜品快照、原子预留 (无部分扣减)、并发竞争、耗尽
//! 自动下架与回补重新上架、手动下架不被回补覆盖、服务矩阵。

mod common;

use common::{booking_draft, guest, seed_item, staff, test_state};
use rust_decimal::Decimal;
use shared::{BookingStatus, OrderStatus, PaymentMethod, ServiceType};
use veranda_server::AppError;
use veranda_server::bookings::VerificationGate;
use veranda_server::db::repository::MenuItemRepository;
use veranda_server::orders::{OrderDraft, OrderLineDraft};

fn draft(lines: Vec<(&str, i64)>) -> OrderDraft {
    OrderDraft {
        lines: lines
            .into_iter()
            .map(|(item, quantity)| OrderLineDraft {
                item: item.to_string(),
                quantity,
                note: None,
            })
            .collect(),
        service: ServiceType::DineIn,
        payment: PaymentMethod::PayAtRestaurant,
        room_or_table: Some("T5".to_string()),
    }
}

#[tokio::test]
async fn create_snapshots_items_and_decrements_stock() {
    let (state, _dir) = test_state().await;
    let soup = seed_item(&state, "Pumpkin Soup", 18, Some(10)).await;
    let bread = seed_item(&state, "Sourdough", 6, None).await;

    let order = state
        .orders
        .create(&guest("g1"), draft(vec![(&soup, 2), (&bread, 3)]))
        .await
        .unwrap();

    assert_eq!(order.status, OrderStatus::Received);
    assert_eq!(order.total, Decimal::from(18 * 2 + 6 * 3));
    assert_eq!(order.items[0].name, "Pumpkin Soup");
    assert_eq!(order.items[0].price, Decimal::from(18));

    let repo = MenuItemRepository::new(state.db.db());
    let soup_item = repo.find_by_key(&soup).await.unwrap().unwrap();
    assert_eq!(soup_item.quantity, Some(8));
    // 不限量菜品不扣减
    let bread_item = repo.find_by_key(&bread).await.unwrap().unwrap();
    assert_eq!(bread_item.quantity, None);
}

#[tokio::test]
async fn insufficient_stock_leaves_nothing_reserved() {
    let (state, _dir) = test_state().await;
    let soup = seed_item(&state, "Pumpkin Soup", 18, Some(10)).await;
    let cake = seed_item(&state, "Cheesecake", 9, Some(2)).await;

    // 第二行不足, 第一行也不得扣减
    let err = state
        .orders
        .create(&guest("g1"), draft(vec![(&soup, 2), (&cake, 3)]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock(_)), "got: {err:?}");

    let repo = MenuItemRepository::new(state.db.db());
    assert_eq!(
        repo.find_by_key(&soup).await.unwrap().unwrap().quantity,
        Some(10)
    );
    assert_eq!(
        repo.find_by_key(&cake).await.unwrap().unwrap().quantity,
        Some(2)
    );
}

#[tokio::test]
async fn concurrent_orders_cannot_oversell() {
    let (state, _dir) = test_state().await;
    let cake = seed_item(&state, "Cheesecake", 9, Some(2)).await;

    let g1 = guest("g1");
    let g2 = guest("g2");
    let (a, b) = tokio::join!(
        state.orders.create(&g1, draft(vec![(&cake, 2)])),
        state.orders.create(&g2, draft(vec![(&cake, 2)])),
    );

    let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(successes, 1, "exactly one of the racing orders may win");

    let loser = if a.is_err() {
        a.unwrap_err()
    } else {
        b.unwrap_err()
    };
    assert!(matches!(
        loser,
        AppError::InsufficientStock(_) | AppError::Conflict(_)
    ));

    let repo = MenuItemRepository::new(state.db.db());
    assert_eq!(
        repo.find_by_key(&cake).await.unwrap().unwrap().quantity,
        Some(0)
    );
}

#[tokio::test]
async fn depletion_auto_disables_and_cancel_restores() {
    let (state, _dir) = test_state().await;
    let g1 = guest("g1");
    let cake = seed_item(&state, "Cheesecake", 9, Some(2)).await;

    let order = state
        .orders
        .create(&g1, draft(vec![(&cake, 2)]))
        .await
        .unwrap();

    let repo = MenuItemRepository::new(state.db.db());
    let depleted = repo.find_by_key(&cake).await.unwrap().unwrap();
    assert_eq!(depleted.quantity, Some(0));
    assert!(!depleted.is_available);
    assert!(depleted.auto_disabled);

    // 耗尽的菜品立即不可下单
    let err = state
        .orders
        .create(&guest("g2"), draft(vec![(&cake, 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "got: {err:?}");

    // 取消回补并重新上架
    state.orders.cancel(&g1, &order.id).await.unwrap();
    let restocked = repo.find_by_key(&cake).await.unwrap().unwrap();
    assert_eq!(restocked.quantity, Some(2));
    assert!(restocked.is_available);
    assert!(!restocked.auto_disabled);
}

#[tokio::test]
async fn manual_disable_survives_restock() {
    let (state, _dir) = test_state().await;
    let g1 = guest("g1");
    let cake = seed_item(&state, "Cheesecake", 9, Some(2)).await;

    let order = state
        .orders
        .create(&g1, draft(vec![(&cake, 2)]))
        .await
        .unwrap();

    // 员工在耗尽期间手动下架: auto_disabled 被清掉
    let repo = MenuItemRepository::new(state.db.db());
    repo.set_availability(&cake, false).await.unwrap();

    // 回补不覆盖员工意志
    state.orders.cancel(&g1, &order.id).await.unwrap();
    let item = repo.find_by_key(&cake).await.unwrap().unwrap();
    assert_eq!(item.quantity, Some(2));
    assert!(!item.is_available);
    assert!(!item.auto_disabled);
}

#[tokio::test]
async fn one_active_order_per_guest_with_compensation() {
    let (state, _dir) = test_state().await;
    let g1 = guest("g1");
    let soup = seed_item(&state, "Pumpkin Soup", 18, Some(10)).await;

    state
        .orders
        .create(&g1, draft(vec![(&soup, 1)]))
        .await
        .unwrap();

    // 第二单被拒, 已预留的库存必须被补偿回补
    let err = state
        .orders
        .create(&g1, draft(vec![(&soup, 4)]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "got: {err:?}");

    let repo = MenuItemRepository::new(state.db.db());
    assert_eq!(
        repo.find_by_key(&soup).await.unwrap().unwrap().quantity,
        Some(9)
    );
}

#[tokio::test]
async fn order_line_cap_is_enforced() {
    let (state, _dir) = test_state().await;
    let mut items = Vec::new();
    for i in 0..11 {
        items.push(seed_item(&state, &format!("Dish {i}"), 10, None).await);
    }

    let lines: Vec<(&str, i64)> = items.iter().map(|k| (k.as_str(), 1)).collect();
    let err = state
        .orders
        .create(&guest("g1"), draft(lines))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got: {err:?}");

    // 空订单同样被拒
    let err = state
        .orders
        .create(&guest("g1"), draft(vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn service_matrix_gates_room_delivery() {
    let (state, _dir) = test_state().await;
    let g1 = guest("g1");
    let soup = seed_item(&state, "Pumpkin Soup", 18, Some(10)).await;

    let mut room_delivery = draft(vec![(&soup, 1)]);
    room_delivery.service = ServiceType::RoomDelivery;
    room_delivery.payment = PaymentMethod::ChargeToRoom;

    // 没有已入住预订: 拒绝
    let err = state
        .orders
        .create(&g1, room_delivery.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "got: {err:?}");

    // 推进预订到 CheckedIn
    let booking = state.bookings.create(&g1, booking_draft()).await.unwrap();
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

    // 已入住但要求现场支付: 拒绝
    let mut pay_at_restaurant = room_delivery.clone();
    pay_at_restaurant.payment = PaymentMethod::PayAtRestaurant;
    let err = state
        .orders
        .create(&g1, pay_at_restaurant)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got: {err:?}");

    // 已入住 + 记房账: 放行
    state.orders.create(&g1, room_delivery).await.unwrap();
}

#[tokio::test]
async fn order_state_machine_is_forward_only() {
    let (state, _dir) = test_state().await;
    let g1 = guest("g1");
    let soup = seed_item(&state, "Pumpkin Soup", 18, Some(10)).await;

    let order = state
        .orders
        .create(&g1, draft(vec![(&soup, 1)]))
        .await
        .unwrap();

    // 跳级被拒
    let err = state
        .orders
        .update_status(&order.id, OrderStatus::Ready)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    for to in [
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Delivered,
        OrderStatus::Completed,
    ] {
        let updated = state.orders.update_status(&order.id, to).await.unwrap();
        assert_eq!(updated.status, to);
    }

    // Completed 不可回退
    let err = state
        .orders
        .update_status(&order.id, OrderStatus::Delivered)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn cancel_only_before_preparation_and_releases_once() {
    let (state, _dir) = test_state().await;
    let g1 = guest("g1");
    let soup = seed_item(&state, "Pumpkin Soup", 18, Some(10)).await;

    let order = state
        .orders
        .create(&g1, draft(vec![(&soup, 3)]))
        .await
        .unwrap();

    // 别的客人不能取消
    let err = state
        .orders
        .cancel(&guest("g2"), &order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    // 进入制作后不可取消
    state
        .orders
        .update_status(&order.id, OrderStatus::Preparing)
        .await
        .unwrap();
    let err = state.orders.cancel(&g1, &order.id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "got: {err:?}");

    // 库存保持扣减状态
    let repo = MenuItemRepository::new(state.db.db());
    assert_eq!(
        repo.find_by_key(&soup).await.unwrap().unwrap().quantity,
        Some(7)
    );

    // 员工视角能看到订单
    let fetched = state.orders.get(&staff(), &order.id).await.unwrap();
    assert_eq!(fetched.status, OrderStatus::Preparing);
}

#[tokio::test]
async fn unknown_menu_item_is_not_found() {
    let (state, _dir) = test_state().await;
    let err = state
        .orders
        .create(&guest("g1"), draft(vec![("nonexistent", 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "got: {err:?}");
}
