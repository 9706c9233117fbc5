mod order_query_service;

pub use order_query_service::{OrderQueryService, OrderView};

use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;

use crate::application::auth::AuthorizationGate;
use crate::application::ApplicationError;
use crate::domain::model::{
    validate_notes, Activity, Order, OrderId, OrderNumber, OrderStatus, ShippingAddress, UserId,
};
use crate::domain::port::{ActivityRecorder, InventoryLedger, OrderRepository, RepositoryError};
use crate::domain::service::{RequestedLine, StockReservationService};

/// 注文番号が衝突した場合の最大試行回数
const MAX_ORDER_NUMBER_ATTEMPTS: u32 = 3;

/// 注文作成コマンド
#[derive(Debug, Clone)]
pub struct CreateOrderCommand {
    pub shipping_address: String,
    pub phone: String,
    pub notes: String,
    pub items: Vec<RequestedLine>,
}

impl CreateOrderCommand {
    /// 変更を始める前にコマンド全体を検証する
    pub fn validate(&self) -> Result<ShippingAddress, ApplicationError> {
        if self.items.is_empty() {
            return Err(ApplicationError::Validation(
                "Order must contain at least one item".to_string(),
            ));
        }
        if let Some(line) = self.items.iter().find(|line| line.quantity == 0) {
            return Err(ApplicationError::Validation(format!(
                "Quantity for product {} must be at least 1",
                line.product_id
            )));
        }
        validate_notes(&self.notes)?;
        let address = ShippingAddress::new(self.shipping_address.clone(), self.phone.clone())?;
        Ok(address)
    }
}

/// 注文ステータス更新コマンド
#[derive(Debug, Clone)]
pub struct UpdateOrderStatusCommand {
    pub status: OrderStatus,
    pub notes: Option<String>,
}

/// 注文ごとの非同期ロック
/// 同じ注文に対するキャンセルとステータス更新を直列化する
#[derive(Default)]
struct OrderLocks {
    locks: Mutex<HashMap<OrderId, Arc<tokio::sync::Mutex<()>>>>,
}

impl OrderLocks {
    async fn acquire(&self, order_id: OrderId) -> OrderLockGuard<'_> {
        let mutex = {
            let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
            locks.entry(order_id).or_default().clone()
        };
        let guard = mutex.lock_owned().await;
        OrderLockGuard {
            locks: self,
            order_id,
            guard: Some(guard),
        }
    }

    /// 待機者のいないロックをマップから取り除く
    fn cleanup(&self, order_id: OrderId) {
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(mutex) = locks.get(&order_id) {
            if Arc::strong_count(mutex) == 1 {
                locks.remove(&order_id);
            }
        }
    }
}

struct OrderLockGuard<'a> {
    locks: &'a OrderLocks,
    order_id: OrderId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for OrderLockGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        self.locks.cleanup(self.order_id);
    }
}

/// 注文アプリケーションサービス
/// 注文の作成、ステータス更新、キャンセルを在庫台帳と注文リポジトリを組み合わせて実行する
pub struct OrderApplicationService {
    order_repository: Arc<dyn OrderRepository>,
    stock: StockReservationService,
    activity_recorder: Arc<dyn ActivityRecorder>,
    query_service: Arc<OrderQueryService>,
    order_locks: OrderLocks,
}

impl OrderApplicationService {
    /// 新しいアプリケーションサービスを作成
    ///
    /// # Arguments
    /// * `order_repository` - 注文リポジトリ
    /// * `ledger` - 在庫台帳
    /// * `activity_recorder` - 活動履歴レコーダー
    /// * `query_service` - 表示用の名前を解決するクエリサービス
    pub fn new(
        order_repository: Arc<dyn OrderRepository>,
        ledger: Arc<dyn InventoryLedger>,
        activity_recorder: Arc<dyn ActivityRecorder>,
        query_service: Arc<OrderQueryService>,
    ) -> Self {
        Self {
            order_repository,
            stock: StockReservationService::new(ledger),
            activity_recorder,
            query_service,
            order_locks: OrderLocks::default(),
        }
    }

    /// 新しい注文を作成
    /// 全明細の在庫予約と注文の保存が成功した場合のみ成功し、失敗時は在庫に一切影響を残さない
    ///
    /// # Arguments
    /// * `user_id` - 認証済みの注文者
    /// * `command` - 配送先と注文明細
    ///
    /// # Returns
    /// * `Ok(OrderView)` - 作成された注文
    /// * `Err(ApplicationError)` - 検証エラー、商品なし、在庫不足、保存失敗
    #[tracing::instrument(skip(self, command), fields(items = command.items.len()))]
    pub async fn create_order(
        &self,
        user_id: UserId,
        command: CreateOrderCommand,
    ) -> Result<OrderView, ApplicationError> {
        let shipping_address = command.validate()?;

        let items = self.stock.reserve_lines(&command.items).await?;

        let order_id = self.order_repository.next_identity();
        let mut attempt = 0;
        let mut order = loop {
            attempt += 1;
            let now = Utc::now();
            let order = match Order::place(
                order_id,
                OrderNumber::generate(now),
                user_id,
                shipping_address.clone(),
                command.notes.clone(),
                items.clone(),
                now,
            ) {
                Ok(order) => order,
                Err(err) => {
                    self.stock.rollback(&items).await;
                    return Err(err.into());
                }
            };

            match self.order_repository.create(&order).await {
                Ok(()) => break order,
                Err(RepositoryError::Duplicate(msg)) if attempt < MAX_ORDER_NUMBER_ATTEMPTS => {
                    tracing::warn!(attempt, reason = %msg, "注文番号が衝突しました。再生成します");
                }
                Err(err) => {
                    tracing::warn!(error = %err, "注文の保存に失敗しました。予約した在庫を戻します");
                    self.stock.rollback(&items).await;
                    return Err(err.into());
                }
            }
        };

        tracing::info!(
            order_id = %order.id(),
            order_number = %order.order_number(),
            total_amount = order.total_amount().amount(),
            "注文を作成しました"
        );
        self.record_activities(user_id, &mut order).await;

        Ok(self.query_service.describe(order).await)
    }

    /// 注文ステータスを更新
    /// 任意のステータスを受け付け、Shipped/Delivered では日付を記録する
    ///
    /// # Arguments
    /// * `actor` - 操作したユーザー（活動履歴用）
    /// * `order_id` - 注文ID
    /// * `command` - 新しいステータスとメモ
    #[tracing::instrument(skip(self, command), fields(status = %command.status))]
    pub async fn update_order_status(
        &self,
        actor: UserId,
        order_id: OrderId,
        command: UpdateOrderStatusCommand,
    ) -> Result<(), ApplicationError> {
        if let Some(notes) = &command.notes {
            validate_notes(notes)?;
        }

        let _lock = self.order_locks.acquire(order_id).await;
        let mut order = self.load_order(order_id).await?;

        order.change_status(command.status, command.notes, Utc::now())?;
        self.persist_transition(&order).await?;

        tracing::info!(order_number = %order.order_number(), "注文ステータスを更新しました");
        self.record_activities(actor, &mut order).await;
        Ok(())
    }

    /// 注文をキャンセル
    /// 全明細の在庫を解放してからステータスをCancelledにする
    /// どちらかが失敗した場合は解放した在庫を戻し、注文はキャンセル可能な状態のまま残る
    /// 再試行しても各明細の在庫は一度だけ解放される
    ///
    /// # Arguments
    /// * `caller` - 認証済みの呼び出し元（注文の所有者である必要がある）
    /// * `order_id` - 注文ID
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(
        &self,
        caller: UserId,
        order_id: OrderId,
    ) -> Result<(), ApplicationError> {
        let _lock = self.order_locks.acquire(order_id).await;
        let mut order = self.load_order(order_id).await?;

        AuthorizationGate::ensure_owner(caller, order.user_id())?;
        order.ensure_cancellable()?;

        self.stock.release_items(order.items()).await?;

        let outcome = match order.cancel(Utc::now()) {
            Ok(()) => self.persist_transition(&order).await,
            Err(err) => Err(err.into()),
        };
        if let Err(err) = outcome {
            tracing::warn!(error = %err, "キャンセルの保存に失敗しました。解放した在庫を戻します");
            self.stock.reclaim(order.items()).await;
            return Err(err);
        }

        tracing::info!(order_number = %order.order_number(), "注文をキャンセルしました");
        self.record_activities(caller, &mut order).await;
        Ok(())
    }

    /// 注文IDで注文を取得（見つからない場合はNotFound）
    pub async fn get_order(&self, order_id: OrderId) -> Result<OrderView, ApplicationError> {
        self.query_service
            .get_order_by_id(order_id)
            .await?
            .ok_or_else(|| not_found(order_id))
    }

    async fn load_order(&self, order_id: OrderId) -> Result<Order, ApplicationError> {
        self.order_repository
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| not_found(order_id))
    }

    /// 状態遷移を保存する
    /// 競合時は存在を確認し直し、消えていればNotFound、残っていればそのまま失敗とする
    async fn persist_transition(&self, order: &Order) -> Result<(), ApplicationError> {
        match self.order_repository.update(order).await {
            Ok(()) => Ok(()),
            Err(RepositoryError::Conflict(msg)) => {
                match self.order_repository.find_by_id(order.id()).await? {
                    None => Err(not_found(order.id())),
                    Some(_) => Err(ApplicationError::Repository(RepositoryError::Conflict(msg))),
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    /// 集約に溜まったイベントを活動履歴として記録する
    /// 記録の失敗は注文操作の結果に影響させない
    async fn record_activities(&self, actor: UserId, order: &mut Order) {
        for event in order.take_domain_events() {
            let activity = Activity::from_event(actor, &event);
            if let Err(err) = self.activity_recorder.record(&activity).await {
                tracing::warn!(
                    event_type = event.event_type(),
                    error = %err,
                    "活動履歴の記録に失敗しました"
                );
            }
        }
    }
}

fn not_found(order_id: OrderId) -> ApplicationError {
    ApplicationError::NotFound(format!("注文が見つかりません: {}", order_id))
}
