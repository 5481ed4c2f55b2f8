//! 库存台账压力测试
//!
//! 多个客人并发下单同一有限库存菜品，验证台账在竞争下
//! 不超卖、不丢失扣减 (账实相符)。

mod common;

use common::{guest, seed_item, test_state};
use rand::Rng;
use shared::{PaymentMethod, ServiceType};
use veranda_server::db::repository::MenuItemRepository;
use veranda_server::orders::{OrderDraft, OrderLineDraft};

const GUEST_COUNT: usize = 24;
const INITIAL_STOCK: i64 = 30;

#[tokio::test]
async fn concurrent_reservations_balance_the_ledger() {
    let (state, _dir) = test_state().await;
    let item = seed_item(&state, "Tasting Menu", 95, Some(INITIAL_STOCK)).await;

    let mut handles = Vec::new();
    for i in 0..GUEST_COUNT {
        let orders = state.orders.clone();
        let item = item.clone();
        handles.push(tokio::spawn(async move {
            let qty = rand::thread_rng().gen_range(1..=3);
            let draft = OrderDraft {
                lines: vec![OrderLineDraft {
                    item,
                    quantity: qty,
                    note: None,
                }],
                service: ServiceType::DineIn,
                payment: PaymentMethod::PayAtRestaurant,
                room_or_table: None,
            };
            orders
                .create(&guest(&format!("guest-{i}")), draft)
                .await
                .ok()
                .map(|_| qty)
        }));
    }

    let mut reserved_total = 0i64;
    for handle in handles {
        if let Some(qty) = handle.await.expect("task join") {
            reserved_total += qty;
        }
    }

    let repo = MenuItemRepository::new(state.db.db());
    let remaining = repo
        .find_by_key(&item)
        .await
        .unwrap()
        .unwrap()
        .quantity
        .unwrap();

    // 账实相符: 初始库存 = 剩余 + 成功订单扣减之和
    assert_eq!(remaining + reserved_total, INITIAL_STOCK);
    assert!(remaining >= 0, "ledger must never go negative");
}
