use chrono::{DateTime, Utc};

use crate::domain::error::DomainError;
use crate::domain::event::{DomainEvent, OrderCancelled, OrderCreated, OrderStatusChanged};
use crate::domain::model::{
    validate_notes, Money, OrderId, OrderItemId, OrderNumber, OrderStatus, ProductId, ShippingAddress, UserId,
};

/// 注文明細
/// 作成後は変更されない。単価は予約時点のスナップショット
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    id: OrderItemId,
    product_id: ProductId,
    quantity: u32,
    unit_price: Money,
    total_price: Money,
}

impl OrderItem {
    /// 新しい注文明細を作成
    /// 数量は1以上である必要がある
    pub fn new(product_id: ProductId, quantity: u32, unit_price: Money) -> Result<Self, DomainError> {
        Self::reconstruct(OrderItemId::new(), product_id, quantity, unit_price)
    }

    /// データベースから取得したデータで注文明細を再構築
    pub fn reconstruct(
        id: OrderItemId,
        product_id: ProductId,
        quantity: u32,
        unit_price: Money,
    ) -> Result<Self, DomainError> {
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity);
        }
        let total_price = unit_price.multiply(quantity)?;
        Ok(Self {
            id,
            product_id,
            quantity,
            unit_price,
            total_price,
        })
    }

    pub fn id(&self) -> OrderItemId {
        self.id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    /// 小計（単価 × 数量）
    pub fn total_price(&self) -> Money {
        self.total_price
    }
}

/// 永続化された注文の各フィールド
/// リポジトリから集約を再構築する際に使用する
#[derive(Debug, Clone)]
pub struct OrderRecord {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub user_id: UserId,
    pub shipping_address: ShippingAddress,
    pub notes: String,
    pub items: Vec<OrderItem>,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub order_date: DateTime<Utc>,
    pub shipped_date: Option<DateTime<Utc>>,
    pub delivered_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u32,
}

/// Order集約
/// 注文のライフサイクルを管理し、ビジネスルールを適用する
#[derive(Debug, Clone)]
pub struct Order {
    id: OrderId,
    order_number: OrderNumber,
    user_id: UserId,
    shipping_address: ShippingAddress,
    notes: String,
    items: Vec<OrderItem>,
    total_amount: Money,
    status: OrderStatus,
    order_date: DateTime<Utc>,
    shipped_date: Option<DateTime<Utc>>,
    delivered_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: u32,
    domain_events: Vec<DomainEvent>,
}

impl Order {
    /// 新しい注文を作成
    /// 初期ステータスはPending、合計金額は明細の小計の合算で固定される
    pub fn place(
        id: OrderId,
        order_number: OrderNumber,
        user_id: UserId,
        shipping_address: ShippingAddress,
        notes: String,
        items: Vec<OrderItem>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if items.is_empty() {
            return Err(DomainError::OrderValidation(
                "注文には少なくとも1つの明細が必要です".to_string(),
            ));
        }
        validate_notes(&notes)?;

        let total_amount = Self::sum_items(&items)?;
        let event = OrderCreated {
            order_id: id,
            order_number: order_number.clone(),
            user_id,
            total_amount,
            item_count: items.len(),
            occurred_at: now,
        };

        Ok(Self {
            id,
            order_number,
            user_id,
            shipping_address,
            notes,
            items,
            total_amount,
            status: OrderStatus::Pending,
            order_date: now,
            shipped_date: None,
            delivered_date: None,
            created_at: now,
            updated_at: now,
            version: 0,
            domain_events: vec![DomainEvent::OrderCreated(event)],
        })
    }

    /// データベースから取得したデータで注文を再構築
    /// 合計金額と明細が一致しない場合は失敗する
    pub fn reconstruct(record: OrderRecord) -> Result<Self, DomainError> {
        if record.items.is_empty() {
            return Err(DomainError::OrderValidation(format!(
                "注文 {} に明細がありません",
                record.id
            )));
        }
        let expected = Self::sum_items(&record.items)?;
        if expected != record.total_amount {
            return Err(DomainError::InvalidValue(format!(
                "注文 {} の合計金額が明細と一致しません",
                record.id
            )));
        }

        Ok(Self {
            id: record.id,
            order_number: record.order_number,
            user_id: record.user_id,
            shipping_address: record.shipping_address,
            notes: record.notes,
            items: record.items,
            total_amount: record.total_amount,
            status: record.status,
            order_date: record.order_date,
            shipped_date: record.shipped_date,
            delivered_date: record.delivered_date,
            created_at: record.created_at,
            updated_at: record.updated_at,
            version: record.version,
            domain_events: Vec::new(),
        })
    }

    fn sum_items(items: &[OrderItem]) -> Result<Money, DomainError> {
        items
            .iter()
            .try_fold(Money::zero(), |acc, item| acc.add(&item.total_price()))
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn order_number(&self) -> &OrderNumber {
        &self.order_number
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn shipping_address(&self) -> &ShippingAddress {
        &self.shipping_address
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn order_date(&self) -> DateTime<Utc> {
        self.order_date
    }

    pub fn shipped_date(&self) -> Option<DateTime<Utc>> {
        self.shipped_date
    }

    pub fn delivered_date(&self) -> Option<DateTime<Utc>> {
        self.delivered_date
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// 楽観的排他制御用のバージョン
    pub fn version(&self) -> u32 {
        self.version
    }

    /// 永続化用のフィールドに分解する（ドメインイベントは含まない）
    pub fn to_record(&self) -> OrderRecord {
        OrderRecord {
            id: self.id,
            order_number: self.order_number.clone(),
            user_id: self.user_id,
            shipping_address: self.shipping_address.clone(),
            notes: self.notes.clone(),
            items: self.items.clone(),
            total_amount: self.total_amount,
            status: self.status,
            order_date: self.order_date,
            shipped_date: self.shipped_date,
            delivered_date: self.delivered_date,
            created_at: self.created_at,
            updated_at: self.updated_at,
            version: self.version,
        }
    }

    /// ドメインイベントを取得してクリア
    pub fn take_domain_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.domain_events)
    }

    /// ステータスを更新する
    /// 遷移グラフは検証しない（管理操作として任意のステータスを受け付ける）
    /// Shippedで発送日、Deliveredで配達日を記録する
    pub fn change_status(
        &mut self,
        new_status: OrderStatus,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let notes = notes.filter(|n| !n.is_empty());
        if let Some(notes) = &notes {
            validate_notes(notes)?;
        }

        let previous_status = self.status;
        self.status = new_status;
        self.updated_at = now;
        if let Some(notes) = notes {
            self.notes = notes;
        }

        match new_status {
            OrderStatus::Shipped => self.shipped_date = Some(now),
            OrderStatus::Delivered => self.delivered_date = Some(now),
            _ => {}
        }

        self.domain_events
            .push(DomainEvent::OrderStatusChanged(OrderStatusChanged {
                order_id: self.id,
                order_number: self.order_number.clone(),
                user_id: self.user_id,
                previous_status,
                new_status,
                occurred_at: now,
            }));

        Ok(())
    }

    /// キャンセル可能かどうかを検証する
    /// 事前条件:
    /// - ステータスがPendingまたはConfirmed
    pub fn ensure_cancellable(&self) -> Result<(), DomainError> {
        match self.status {
            OrderStatus::Pending | OrderStatus::Confirmed => Ok(()),
            OrderStatus::Cancelled => Err(DomainError::InvalidTransition(
                "既にキャンセル済みの注文です".to_string(),
            )),
            OrderStatus::Processing | OrderStatus::Shipped | OrderStatus::Delivered => {
                Err(DomainError::InvalidTransition(
                    "処理中以降の注文はキャンセルできません".to_string(),
                ))
            }
        }
    }

    /// 注文をキャンセル
    /// 在庫の解放は呼び出し側（アプリケーションサービス）の責務
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.ensure_cancellable()?;

        self.status = OrderStatus::Cancelled;
        self.updated_at = now;

        self.domain_events
            .push(DomainEvent::OrderCancelled(OrderCancelled {
                order_id: self.id,
                order_number: self.order_number.clone(),
                user_id: self.user_id,
                occurred_at: now,
            }));

        Ok(())
    }
}
