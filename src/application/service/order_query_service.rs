use std::collections::HashMap;
use std::sync::Arc;

use crate::application::ApplicationError;
use crate::domain::model::{Order, OrderId, ProductId, UserId};
use crate::domain::port::{InventoryLedger, OrderRepository, UserRepository};

/// 表示用の名前を解決済みの注文
#[derive(Debug, Clone)]
pub struct OrderView {
    pub order: Order,
    pub user_name: String,
    pub product_names: HashMap<ProductId, String>,
}

impl OrderView {
    /// 商品名（解決できなかった場合は空文字）
    pub fn product_name(&self, product_id: ProductId) -> &str {
        self.product_names
            .get(&product_id)
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// 注文クエリサービス
/// 読み取り専用の注文操作を提供する
pub struct OrderQueryService {
    order_repository: Arc<dyn OrderRepository>,
    ledger: Arc<dyn InventoryLedger>,
    user_repository: Arc<dyn UserRepository>,
}

impl OrderQueryService {
    /// 新しい注文クエリサービスを作成
    pub fn new(
        order_repository: Arc<dyn OrderRepository>,
        ledger: Arc<dyn InventoryLedger>,
        user_repository: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            order_repository,
            ledger,
            user_repository,
        }
    }

    /// 注文IDで注文を取得
    ///
    /// # Returns
    /// * `Ok(Some(OrderView))` - 注文が見つかった
    /// * `Ok(None)` - 注文が見つからなかった
    /// * `Err(ApplicationError)` - 取得失敗
    pub async fn get_order_by_id(&self, id: OrderId) -> Result<Option<OrderView>, ApplicationError> {
        match self.order_repository.find_by_id(id).await? {
            Some(order) => Ok(Some(self.describe(order).await)),
            None => Ok(None),
        }
    }

    /// すべての注文を注文日時の降順で取得
    pub async fn get_all_orders(&self) -> Result<Vec<OrderView>, ApplicationError> {
        let orders = self.order_repository.find_all().await?;
        Ok(self.describe_all(orders).await)
    }

    /// 指定ユーザーの注文を注文日時の降順で取得
    pub async fn get_orders_by_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<OrderView>, ApplicationError> {
        let orders = self.order_repository.find_by_user(user_id).await?;
        Ok(self.describe_all(orders).await)
    }

    /// 注文にユーザー名と商品名を付与する
    /// 名前の解決に失敗しても注文自体は返す
    pub async fn describe(&self, order: Order) -> OrderView {
        let mut user_names = HashMap::new();
        let mut product_names = HashMap::new();
        self.describe_with(order, &mut user_names, &mut product_names)
            .await
    }

    async fn describe_all(&self, orders: Vec<Order>) -> Vec<OrderView> {
        let mut user_names = HashMap::new();
        let mut product_names = HashMap::new();
        let mut views = Vec::with_capacity(orders.len());
        for order in orders {
            views.push(
                self.describe_with(order, &mut user_names, &mut product_names)
                    .await,
            );
        }
        views
    }

    async fn describe_with(
        &self,
        order: Order,
        user_names: &mut HashMap<UserId, String>,
        product_names: &mut HashMap<ProductId, String>,
    ) -> OrderView {
        let user_id = order.user_id();
        if !user_names.contains_key(&user_id) {
            let name = match self.user_repository.find_by_id(user_id).await {
                Ok(user) => user.map(|u| u.name().to_string()).unwrap_or_default(),
                Err(err) => {
                    tracing::warn!(user_id = %user_id, error = %err, "ユーザー名の解決に失敗しました");
                    String::new()
                }
            };
            user_names.insert(user_id, name);
        }

        let mut names = HashMap::new();
        for item in order.items() {
            let product_id = item.product_id();
            if !product_names.contains_key(&product_id) {
                let name = match self.ledger.find_product(product_id).await {
                    Ok(product) => product.map(|p| p.name().to_string()).unwrap_or_default(),
                    Err(err) => {
                        tracing::warn!(product_id = %product_id, error = %err, "商品名の解決に失敗しました");
                        String::new()
                    }
                };
                product_names.insert(product_id, name);
            }
            if let Some(name) = product_names.get(&product_id) {
                names.insert(product_id, name.clone());
            }
        }

        OrderView {
            user_name: user_names.get(&user_id).cloned().unwrap_or_default(),
            product_names: names,
            order,
        }
    }
}
