use storefront_order_management::adapter::driven::{
    InMemoryActivityLog, InMemoryInventoryLedger, InMemoryOrderRepository, InMemoryUserRepository,
};
use storefront_order_management::application::service::{
    CreateOrderCommand, OrderApplicationService, OrderQueryService, UpdateOrderStatusCommand,
};
use storefront_order_management::application::ApplicationError;
use storefront_order_management::domain::model::{
    ActivityType, Money, OrderId, OrderStatus, Product, ProductId, User, UserId,
};
use storefront_order_management::domain::port::InventoryLedger;
use storefront_order_management::domain::service::RequestedLine;

use std::sync::Arc;

/// インメモリアダプターで組み立てた注文エンジン
struct Harness {
    ledger: Arc<InMemoryInventoryLedger>,
    users: Arc<InMemoryUserRepository>,
    activities: Arc<InMemoryActivityLog>,
    query: Arc<OrderQueryService>,
    service: Arc<OrderApplicationService>,
}

impl Harness {
    fn new() -> Self {
        let orders = Arc::new(InMemoryOrderRepository::new());
        let ledger = Arc::new(InMemoryInventoryLedger::new());
        let users = Arc::new(InMemoryUserRepository::new());
        let activities = Arc::new(InMemoryActivityLog::new());
        let query = Arc::new(OrderQueryService::new(
            orders.clone(),
            ledger.clone(),
            users.clone(),
        ));
        let service = Arc::new(OrderApplicationService::new(
            orders,
            ledger.clone(),
            activities.clone(),
            query.clone(),
        ));
        Self {
            ledger,
            users,
            activities,
            query,
            service,
        }
    }

    async fn product(&self, name: &str, price: i64, stock: u32) -> ProductId {
        let product = Product::new(ProductId::new(), name.to_string(), Money::idr(price), stock)
            .unwrap();
        self.ledger.save_product(&product).await.unwrap();
        product.id()
    }

    async fn user(&self, name: &str) -> UserId {
        let user = User::new(UserId::new(), name.to_string(), format!("{}@example.com", name));
        let id = user.id();
        self.users.insert(user).await;
        id
    }

    async fn stock(&self, product_id: ProductId) -> u32 {
        self.ledger
            .find_product(product_id)
            .await
            .unwrap()
            .unwrap()
            .stock()
    }

    async fn status(&self, order_id: OrderId) -> OrderStatus {
        self.service.get_order(order_id).await.unwrap().order.status()
    }

    async fn place(&self, user_id: UserId, items: &[(ProductId, u32)]) -> OrderId {
        self.service
            .create_order(user_id, command(items))
            .await
            .unwrap()
            .order
            .id()
    }

    async fn set_status(&self, user_id: UserId, order_id: OrderId, status: OrderStatus) {
        self.service
            .update_order_status(
                user_id,
                order_id,
                UpdateOrderStatusCommand {
                    status,
                    notes: None,
                },
            )
            .await
            .unwrap();
    }
}

fn command(items: &[(ProductId, u32)]) -> CreateOrderCommand {
    CreateOrderCommand {
        shipping_address: "Jl. Diponegoro 45, Semarang".to_string(),
        phone: "081234567890".to_string(),
        notes: String::new(),
        items: items
            .iter()
            .map(|&(product_id, quantity)| RequestedLine {
                product_id,
                quantity,
            })
            .collect(),
    }
}

#[tokio::test]
async fn test_create_order_reserves_stock_and_totals_lines() {
    let h = Harness::new();
    let p1 = h.product("Kopi Toraja", 25_000, 5).await;
    let user = h.user("rina").await;

    let view = h.service.create_order(user, command(&[(p1, 3)])).await.unwrap();

    assert_eq!(h.stock(p1).await, 2);
    assert_eq!(view.order.total_amount(), Money::idr(75_000));
    assert_eq!(view.order.status(), OrderStatus::Pending);
    assert_eq!(view.user_name, "rina");
    assert_eq!(view.product_name(p1), "Kopi Toraja");
    assert!(view.order.order_number().as_str().starts_with("ORD-"));
}

#[tokio::test]
async fn test_create_order_with_insufficient_stock_leaves_stock_unchanged() {
    let h = Harness::new();
    let p1 = h.product("Kopi Toraja", 25_000, 5).await;
    let user = h.user("rina").await;

    let result = h.service.create_order(user, command(&[(p1, 10)])).await;

    assert!(matches!(result, Err(ApplicationError::InsufficientStock(_))));
    assert_eq!(h.stock(p1).await, 5);
}

#[tokio::test]
async fn test_partial_reservation_is_rolled_back() {
    let h = Harness::new();
    let p1 = h.product("Teh Tarik", 8_000, 5).await;
    let p2 = h.product("Gula Aren", 12_000, 1).await;
    let user = h.user("rina").await;

    let result = h
        .service
        .create_order(user, command(&[(p1, 2), (p2, 4)]))
        .await;

    assert!(matches!(result, Err(ApplicationError::InsufficientStock(_))));
    assert_eq!(h.stock(p1).await, 5);
    assert_eq!(h.stock(p2).await, 1);
    assert!(h.activities.entries().await.is_empty());
}

#[tokio::test]
async fn test_empty_item_list_is_rejected() {
    let h = Harness::new();
    let user = h.user("rina").await;

    let result = h.service.create_order(user, command(&[])).await;
    assert!(matches!(result, Err(ApplicationError::Validation(_))));
}

#[tokio::test]
async fn test_inactive_product_is_not_found() {
    let h = Harness::new();
    let mut product = Product::new(ProductId::new(), "Rendang".to_string(), Money::idr(50_000), 9)
        .unwrap();
    product.deactivate();
    h.ledger.save_product(&product).await.unwrap();
    let user = h.user("rina").await;

    let result = h.service.create_order(user, command(&[(product.id(), 1)])).await;
    assert!(matches!(result, Err(ApplicationError::NotFound(_))));
    assert_eq!(h.stock(product.id()).await, 9);
}

#[tokio::test]
async fn test_cancel_pending_order_restores_exact_stock() {
    let h = Harness::new();
    let p1 = h.product("Kopi Toraja", 25_000, 5).await;
    let user = h.user("rina").await;
    let order_id = h.place(user, &[(p1, 3)]).await;

    h.service.cancel_order(user, order_id).await.unwrap();

    assert_eq!(h.stock(p1).await, 5);
    assert_eq!(h.status(order_id).await, OrderStatus::Cancelled);

    let kinds: Vec<ActivityType> = h
        .activities
        .entries()
        .await
        .iter()
        .map(|a| a.activity_type)
        .collect();
    assert_eq!(
        kinds,
        vec![ActivityType::OrderCreated, ActivityType::OrderCancelled]
    );
}

#[tokio::test]
async fn test_cancel_confirmed_order_is_allowed() {
    let h = Harness::new();
    let p1 = h.product("Kopi Toraja", 25_000, 5).await;
    let user = h.user("rina").await;
    let order_id = h.place(user, &[(p1, 1)]).await;
    h.set_status(user, order_id, OrderStatus::Confirmed).await;

    h.service.cancel_order(user, order_id).await.unwrap();
    assert_eq!(h.stock(p1).await, 5);
}

#[tokio::test]
async fn test_cancel_after_product_deactivation_restores_stock() {
    let h = Harness::new();
    let p1 = h.product("Kopi Toraja", 25_000, 5).await;
    let user = h.user("rina").await;
    let order_id = h.place(user, &[(p1, 3)]).await;

    let mut product = h.ledger.find_product(p1).await.unwrap().unwrap();
    product.deactivate();
    h.ledger.save_product(&product).await.unwrap();

    h.service.cancel_order(user, order_id).await.unwrap();

    let product = h.ledger.find_product(p1).await.unwrap().unwrap();
    assert_eq!(product.stock(), 5);
    assert!(!product.is_active());
    assert_eq!(h.status(order_id).await, OrderStatus::Cancelled);
}

#[tokio::test]
async fn test_cancel_shipped_order_is_invalid_transition() {
    let h = Harness::new();
    let p1 = h.product("Kopi Toraja", 25_000, 5).await;
    let user = h.user("rina").await;
    let order_id = h.place(user, &[(p1, 3)]).await;
    h.set_status(user, order_id, OrderStatus::Shipped).await;

    let result = h.service.cancel_order(user, order_id).await;

    assert!(matches!(result, Err(ApplicationError::InvalidTransition(_))));
    assert_eq!(h.stock(p1).await, 2);
    assert_eq!(h.status(order_id).await, OrderStatus::Shipped);
}

#[tokio::test]
async fn test_cancel_by_non_owner_is_forbidden() {
    let h = Harness::new();
    let p1 = h.product("Kopi Toraja", 25_000, 5).await;
    let owner = h.user("rina").await;
    let stranger = h.user("joko").await;
    let order_id = h.place(owner, &[(p1, 3)]).await;

    let result = h.service.cancel_order(stranger, order_id).await;

    assert!(matches!(result, Err(ApplicationError::Forbidden(_))));
    assert_eq!(h.stock(p1).await, 2);
    assert_eq!(h.status(order_id).await, OrderStatus::Pending);
}

#[tokio::test]
async fn test_cancel_missing_order_is_not_found() {
    let h = Harness::new();
    let user = h.user("rina").await;
    let result = h.service.cancel_order(user, OrderId::new()).await;
    assert!(matches!(result, Err(ApplicationError::NotFound(_))));
}

#[tokio::test]
async fn test_status_update_stamps_shipped_and_delivered_dates() {
    let h = Harness::new();
    let p1 = h.product("Kopi Toraja", 25_000, 5).await;
    let user = h.user("rina").await;
    let order_id = h.place(user, &[(p1, 1)]).await;

    h.set_status(user, order_id, OrderStatus::Shipped).await;
    let shipped = h.service.get_order(order_id).await.unwrap().order;
    assert!(shipped.shipped_date().is_some());
    assert!(shipped.delivered_date().is_none());

    h.set_status(user, order_id, OrderStatus::Delivered).await;
    let delivered = h.service.get_order(order_id).await.unwrap().order;
    assert_eq!(delivered.shipped_date(), shipped.shipped_date());
    assert!(delivered.delivered_date().is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_orders_for_last_unit_yield_one_success() {
    let h = Harness::new();
    let p1 = h.product("Edisi Terbatas", 99_000, 1).await;
    let first = h.user("rina").await;
    let second = h.user("joko").await;

    let service_a = h.service.clone();
    let service_b = h.service.clone();
    let a = tokio::spawn(async move { service_a.create_order(first, command(&[(p1, 1)])).await });
    let b = tokio::spawn(async move { service_b.create_order(second, command(&[(p1, 1)])).await });

    let results = [a.await.unwrap(), b.await.unwrap()];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    let shortages = results
        .iter()
        .filter(|r| matches!(r, Err(ApplicationError::InsufficientStock(_))))
        .count();

    assert_eq!(successes, 1);
    assert_eq!(shortages, 1);
    assert_eq!(h.stock(p1).await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_cancellations_restore_stock_once() {
    let h = Harness::new();
    let p1 = h.product("Kopi Toraja", 25_000, 5).await;
    let user = h.user("rina").await;
    let order_id = h.place(user, &[(p1, 3)]).await;

    let mut handles = Vec::new();
    for _ in 0..4 {
        let service = h.service.clone();
        handles.push(tokio::spawn(
            async move { service.cancel_order(user, order_id).await },
        ));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => successes += 1,
            Err(err) => assert!(matches!(err, ApplicationError::InvalidTransition(_))),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(h.stock(p1).await, 5);
}

#[tokio::test]
async fn test_listing_by_user_is_newest_first() {
    let h = Harness::new();
    let p1 = h.product("Kopi Toraja", 25_000, 10).await;
    let user = h.user("rina").await;
    let other = h.user("joko").await;
    let older = h.place(user, &[(p1, 1)]).await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let newer = h.place(user, &[(p1, 1)]).await;
    h.place(other, &[(p1, 1)]).await;

    let mine: Vec<OrderId> = h
        .query
        .get_orders_by_user(user)
        .await
        .unwrap()
        .iter()
        .map(|view| view.order.id())
        .collect();
    assert_eq!(mine, vec![newer, older]);

    assert_eq!(h.query.get_all_orders().await.unwrap().len(), 3);
}
