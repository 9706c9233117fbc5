use proptest::prelude::*;
use storefront_order_management::adapter::driven::InMemoryInventoryLedger;
use storefront_order_management::domain::model::{
    Money, Order, OrderId, OrderItem, OrderNumber, Product, ProductId, ShippingAddress, UserId,
};
use storefront_order_management::domain::port::InventoryLedger;

use chrono::Utc;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

/// 在庫操作（true: 予約, false: 解放）と数量
fn ledger_operations() -> impl Strategy<Value = Vec<(bool, u32)>> {
    prop::collection::vec((any::<bool>(), 1u32..8), 1..40)
}

// Money のプロパティベーステスト
proptest! {
    /// Money の加算は交換法則を満たす (a + b = b + a)
    #[test]
    fn test_money_addition_is_commutative(
        amount1 in 0i64..1_000_000_000,
        amount2 in 0i64..1_000_000_000,
    ) {
        let money1 = Money::idr(amount1);
        let money2 = Money::idr(amount2);

        prop_assert_eq!(money1.add(&money2).unwrap(), money2.add(&money1).unwrap());
    }

    /// Money の乗算は分配法則を満たす (a * (b + c) = a * b + a * c)
    #[test]
    fn test_money_multiplication_distributive(
        base_amount in 1i64..100_000,
        factor1 in 1u32..100,
        factor2 in 1u32..100,
    ) {
        let money = Money::idr(base_amount);

        let left_side = money.multiply(factor1 + factor2).unwrap();
        let right_side = money
            .multiply(factor1)
            .unwrap()
            .add(&money.multiply(factor2).unwrap())
            .unwrap();

        prop_assert_eq!(left_side, right_side);
    }
}

// 在庫台帳のプロパティベーステスト
proptest! {
    /// 任意の予約・解放の列のあとも在庫は負にならず、成功した操作の合計と一致する
    #[test]
    fn test_stock_never_goes_negative(
        initial in 0u32..20,
        operations in ledger_operations(),
    ) {
        let rt = runtime();
        let ledger = InMemoryInventoryLedger::new();
        let product = Product::new(ProductId::new(), "Beras".to_string(), Money::idr(14_000), initial).unwrap();
        let product_id = product.id();

        let (expected, actual) = rt.block_on(async {
            ledger.save_product(&product).await.unwrap();
            let mut expected = initial;
            let mut reserved = 0u32;

            for (is_reserve, quantity) in operations {
                if is_reserve {
                    match ledger.reserve(product_id, quantity).await {
                        Ok(_) => {
                            expected -= quantity;
                            reserved += quantity;
                        }
                        Err(_) => assert!(expected < quantity),
                    }
                } else if reserved >= quantity {
                    // 予約済みの範囲でのみ解放する
                    ledger.release(product_id, quantity).await.unwrap();
                    expected += quantity;
                    reserved -= quantity;
                }
            }

            let actual = ledger.find_product(product_id).await.unwrap().unwrap().stock();
            (expected, actual)
        });

        prop_assert_eq!(actual, expected);
    }

    /// 予約に成功した数量をすべて解放すると初期在庫に戻る
    #[test]
    fn test_release_restores_reserved_quantities(
        initial in 0u32..50,
        quantities in prop::collection::vec(1u32..10, 1..10),
    ) {
        let rt = runtime();
        let ledger = InMemoryInventoryLedger::new();
        let product = Product::new(ProductId::new(), "Beras".to_string(), Money::idr(14_000), initial).unwrap();
        let product_id = product.id();

        let restored = rt.block_on(async {
            ledger.save_product(&product).await.unwrap();
            let mut reserved = Vec::new();
            for quantity in quantities {
                if ledger.reserve(product_id, quantity).await.is_ok() {
                    reserved.push(quantity);
                }
            }
            for quantity in reserved.into_iter().rev() {
                ledger.release(product_id, quantity).await.unwrap();
            }
            ledger.find_product(product_id).await.unwrap().unwrap().stock()
        });

        prop_assert_eq!(restored, initial);
    }
}

// 注文のプロパティベーステスト
proptest! {
    /// 注文の合計金額は明細の小計の合計と等しい
    #[test]
    fn test_order_total_is_sum_of_line_totals(
        lines in prop::collection::vec((0i64..500_000, 1u32..20), 1..10),
    ) {
        let items: Vec<OrderItem> = lines
            .iter()
            .map(|&(price, quantity)| OrderItem::new(ProductId::new(), quantity, Money::idr(price)).unwrap())
            .collect();
        let expected: i64 = lines.iter().map(|&(price, quantity)| price * quantity as i64).sum();

        let now = Utc::now();
        let order = Order::place(
            OrderId::new(),
            OrderNumber::generate(now),
            UserId::new(),
            ShippingAddress::new("Jl. Pemuda 10".to_string(), String::new()).unwrap(),
            String::new(),
            items,
            now,
        ).unwrap();

        prop_assert_eq!(order.total_amount().amount(), expected);
        for item in order.items() {
            prop_assert_eq!(
                item.total_price().amount(),
                item.unit_price().amount() * item.quantity() as i64
            );
        }
    }
}
