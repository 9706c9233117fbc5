// インメモリアダプター
// テストとローカル実行用。プロセス内のマップに集約を保持する

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::domain::model::{
    Money, Order, OrderId, OrderItemId, Product, ProductId, User, UserId,
};
use crate::domain::port::{
    InventoryLedger, LedgerError, OrderRepository, RepositoryError, UserRepository,
};

/// インメモリ注文リポジトリ
#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: Mutex<HashMap<OrderId, Order>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
        orders.sort_by(|a, b| b.order_date().cmp(&a.order_date()));
        orders
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut orders = self.orders.lock().await;
        if orders.contains_key(&order.id()) {
            return Err(RepositoryError::Duplicate(format!("order id {}", order.id())));
        }
        if orders
            .values()
            .any(|existing| existing.order_number() == order.order_number())
        {
            return Err(RepositoryError::Duplicate(format!(
                "order number {}",
                order.order_number()
            )));
        }

        let mut stored = order.clone();
        stored.take_domain_events();
        orders.insert(order.id(), stored);
        Ok(())
    }

    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.orders.lock().await.get(&order_id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let orders = self.orders.lock().await.values().cloned().collect();
        Ok(Self::newest_first(orders))
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let orders = self
            .orders
            .lock()
            .await
            .values()
            .filter(|order| order.user_id() == user_id)
            .cloned()
            .collect();
        Ok(Self::newest_first(orders))
    }

    async fn update(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut orders = self.orders.lock().await;
        let current = orders
            .get(&order.id())
            .ok_or_else(|| RepositoryError::Conflict(format!("order {} does not exist", order.id())))?;
        if current.version() != order.version() {
            return Err(RepositoryError::Conflict(format!(
                "order {} was modified concurrently (stored version {}, given {})",
                order.id(),
                current.version(),
                order.version()
            )));
        }

        let mut record = order.to_record();
        record.version += 1;
        let stored = Order::reconstruct(record)
            .map_err(|e| RepositoryError::OperationFailed(e.to_string()))?;
        orders.insert(order.id(), stored);
        Ok(())
    }
}

/// 商品と、その商品に対して解放済みの注文明細
#[derive(Debug)]
struct StockEntry {
    product: Product,
    released_lines: HashSet<OrderItemId>,
}

/// インメモリ在庫台帳
/// 商品ごとに非同期ミューテックスを持ち、同一商品の予約と解放を直列化する
#[derive(Default)]
pub struct InMemoryInventoryLedger {
    products: RwLock<HashMap<ProductId, Arc<Mutex<StockEntry>>>>,
}

impl InMemoryInventoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    async fn entry(&self, product_id: ProductId) -> Result<Arc<Mutex<StockEntry>>, LedgerError> {
        self.products
            .read()
            .await
            .get(&product_id)
            .cloned()
            .ok_or(LedgerError::ProductNotFound(product_id))
    }
}

#[async_trait]
impl InventoryLedger for InMemoryInventoryLedger {
    async fn reserve(&self, product_id: ProductId, quantity: u32) -> Result<Money, LedgerError> {
        let entry = self.entry(product_id).await?;
        let mut entry = entry.lock().await;
        if !entry.product.is_active() {
            return Err(LedgerError::ProductNotFound(product_id));
        }
        let product = &mut entry.product;
        product
            .reserve(quantity)
            .map_err(|err| LedgerError::from_domain(product, quantity, err))
    }

    async fn release(&self, product_id: ProductId, quantity: u32) -> Result<(), LedgerError> {
        let entry = self.entry(product_id).await?;
        let mut entry = entry.lock().await;
        let product = &mut entry.product;
        product
            .release(quantity)
            .map_err(|err| LedgerError::from_domain(product, quantity, err))
    }

    async fn release_line(
        &self,
        item_id: OrderItemId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<bool, LedgerError> {
        let entry = self.entry(product_id).await?;
        let mut entry = entry.lock().await;
        if entry.released_lines.contains(&item_id) {
            return Ok(false);
        }
        let product = &mut entry.product;
        product
            .release(quantity)
            .map_err(|err| LedgerError::from_domain(product, quantity, err))?;
        entry.released_lines.insert(item_id);
        Ok(true)
    }

    async fn reclaim_line(
        &self,
        item_id: OrderItemId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), LedgerError> {
        let entry = self.entry(product_id).await?;
        let mut entry = entry.lock().await;
        if !entry.released_lines.contains(&item_id) {
            return Ok(());
        }
        let product = &mut entry.product;
        product
            .reserve(quantity)
            .map_err(|err| LedgerError::from_domain(product, quantity, err))?;
        entry.released_lines.remove(&item_id);
        Ok(())
    }

    async fn find_product(&self, product_id: ProductId) -> Result<Option<Product>, RepositoryError> {
        match self.entry(product_id).await {
            Ok(entry) => Ok(Some(entry.lock().await.product.clone())),
            Err(_) => Ok(None),
        }
    }

    async fn save_product(&self, product: &Product) -> Result<(), RepositoryError> {
        if let Ok(entry) = self.entry(product.id()).await {
            entry.lock().await.product = product.clone();
            return Ok(());
        }
        self.products
            .write()
            .await
            .entry(product.id())
            .or_insert_with(|| {
                Arc::new(Mutex::new(StockEntry {
                    product: product.clone(),
                    released_lines: HashSet::new(),
                }))
            });
        Ok(())
    }
}

/// インメモリユーザーリポジトリ
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// ユーザーを登録する（既存の場合は上書き）
    pub async fn insert(&self, user: User) {
        self.users.write().await.insert(user.id(), user);
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, user_id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.read().await.get(&user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{OrderItem, OrderNumber, OrderStatus, ShippingAddress};
    use chrono::Utc;

    fn sample_order() -> Order {
        let now = Utc::now();
        Order::place(
            OrderId::new(),
            OrderNumber::generate(now),
            UserId::new(),
            ShippingAddress::new("Jl. Sudirman 1".to_string(), String::new()).unwrap(),
            String::new(),
            vec![OrderItem::new(ProductId::new(), 2, Money::idr(10_000)).unwrap()],
            now,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_update_bumps_version_and_rejects_stale_write() {
        let repo = InMemoryOrderRepository::new();
        let order = sample_order();
        repo.create(&order).await.unwrap();

        let mut first = repo.find_by_id(order.id()).await.unwrap().unwrap();
        let mut stale = first.clone();
        first
            .change_status(OrderStatus::Confirmed, None, Utc::now())
            .unwrap();
        repo.update(&first).await.unwrap();

        let stored = repo.find_by_id(order.id()).await.unwrap().unwrap();
        assert_eq!(stored.version(), 1);
        assert_eq!(stored.status(), OrderStatus::Confirmed);

        stale.cancel(Utc::now()).unwrap();
        let result = repo.update(&stale).await;
        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_update_missing_order_is_conflict() {
        let repo = InMemoryOrderRepository::new();
        let result = repo.update(&sample_order()).await;
        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_order_number() {
        let repo = InMemoryOrderRepository::new();
        let order = sample_order();
        repo.create(&order).await.unwrap();

        let mut record = sample_order().to_record();
        record.order_number = order.order_number().clone();
        let clash = Order::reconstruct(record).unwrap();

        let result = repo.create(&clash).await;
        assert!(matches!(result, Err(RepositoryError::Duplicate(_))));
    }

    #[tokio::test]
    async fn test_ledger_reserve_and_release() {
        let ledger = InMemoryInventoryLedger::new();
        let product =
            Product::new(ProductId::new(), "Teh".to_string(), Money::idr(4_000), 3).unwrap();
        ledger.save_product(&product).await.unwrap();

        assert_eq!(ledger.reserve(product.id(), 2).await.unwrap(), Money::idr(4_000));
        assert!(matches!(
            ledger.reserve(product.id(), 2).await,
            Err(LedgerError::InsufficientStock {
                requested: 2,
                available: 1,
                ..
            })
        ));
        ledger.release(product.id(), 2).await.unwrap();

        let stored = ledger.find_product(product.id()).await.unwrap().unwrap();
        assert_eq!(stored.stock(), 3);
    }

    #[tokio::test]
    async fn test_release_line_is_applied_once_per_item() {
        let ledger = InMemoryInventoryLedger::new();
        let product =
            Product::new(ProductId::new(), "Teh".to_string(), Money::idr(4_000), 5).unwrap();
        ledger.save_product(&product).await.unwrap();
        ledger.reserve(product.id(), 3).await.unwrap();
        let item_id = OrderItemId::new();

        assert!(ledger.release_line(item_id, product.id(), 3).await.unwrap());
        assert!(!ledger.release_line(item_id, product.id(), 3).await.unwrap());

        let stored = ledger.find_product(product.id()).await.unwrap().unwrap();
        assert_eq!(stored.stock(), 5);
    }

    #[tokio::test]
    async fn test_reclaim_line_ignores_deactivation_and_clears_record() {
        let ledger = InMemoryInventoryLedger::new();
        let mut product =
            Product::new(ProductId::new(), "Teh".to_string(), Money::idr(4_000), 5).unwrap();
        ledger.save_product(&product).await.unwrap();
        ledger.reserve(product.id(), 3).await.unwrap();
        product = ledger.find_product(product.id()).await.unwrap().unwrap();
        product.deactivate();
        ledger.save_product(&product).await.unwrap();
        let item_id = OrderItemId::new();

        ledger.release_line(item_id, product.id(), 3).await.unwrap();
        ledger.reclaim_line(item_id, product.id(), 3).await.unwrap();
        let stored = ledger.find_product(product.id()).await.unwrap().unwrap();
        assert_eq!(stored.stock(), 2);

        // 記録が消えているので再度解放できる
        assert!(ledger.release_line(item_id, product.id(), 3).await.unwrap());
        // 記録のない明細の取り戻しは何もしない
        ledger.reclaim_line(OrderItemId::new(), product.id(), 3).await.unwrap();
        let stored = ledger.find_product(product.id()).await.unwrap().unwrap();
        assert_eq!(stored.stock(), 5);
    }

    #[tokio::test]
    async fn test_reclaim_line_keeps_record_when_stock_was_taken() {
        let ledger = InMemoryInventoryLedger::new();
        let product =
            Product::new(ProductId::new(), "Teh".to_string(), Money::idr(4_000), 3).unwrap();
        ledger.save_product(&product).await.unwrap();
        ledger.reserve(product.id(), 3).await.unwrap();
        let item_id = OrderItemId::new();

        ledger.release_line(item_id, product.id(), 3).await.unwrap();
        ledger.reserve(product.id(), 2).await.unwrap();

        assert!(matches!(
            ledger.reclaim_line(item_id, product.id(), 3).await,
            Err(LedgerError::InsufficientStock { .. })
        ));
        assert!(!ledger.release_line(item_id, product.id(), 3).await.unwrap());
        let stored = ledger.find_product(product.id()).await.unwrap().unwrap();
        assert_eq!(stored.stock(), 1);
    }

    #[tokio::test]
    async fn test_ledger_inactive_or_unknown_product_is_not_found() {
        let ledger = InMemoryInventoryLedger::new();
        let mut product =
            Product::new(ProductId::new(), "Kopi".to_string(), Money::idr(4_000), 3).unwrap();
        product.deactivate();
        ledger.save_product(&product).await.unwrap();

        assert!(matches!(
            ledger.reserve(product.id(), 1).await,
            Err(LedgerError::ProductNotFound(_))
        ));
        assert!(matches!(
            ledger.reserve(ProductId::new(), 1).await,
            Err(LedgerError::ProductNotFound(_))
        ));
    }
}
