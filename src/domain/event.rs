use chrono::{DateTime, Utc};
use crate::domain::model::{Money, OrderId, OrderNumber, OrderStatus, UserId};

/// ドメインイベント列挙型
/// 活動履歴（riwayat）に記録される注文の出来事
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    /// 注文が作成された
    OrderCreated(OrderCreated),
    /// 注文ステータスが更新された
    OrderStatusChanged(OrderStatusChanged),
    /// 注文がキャンセルされた
    OrderCancelled(OrderCancelled),
}

impl DomainEvent {
    /// イベント種別名
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::OrderCreated(_) => "OrderCreated",
            DomainEvent::OrderStatusChanged(_) => "OrderStatusChanged",
            DomainEvent::OrderCancelled(_) => "OrderCancelled",
        }
    }

    /// 対象の注文ID
    pub fn order_id(&self) -> OrderId {
        match self {
            DomainEvent::OrderCreated(e) => e.order_id,
            DomainEvent::OrderStatusChanged(e) => e.order_id,
            DomainEvent::OrderCancelled(e) => e.order_id,
        }
    }

    /// イベント発生日時
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DomainEvent::OrderCreated(e) => e.occurred_at,
            DomainEvent::OrderStatusChanged(e) => e.occurred_at,
            DomainEvent::OrderCancelled(e) => e.occurred_at,
        }
    }
}

/// 注文作成イベント
#[derive(Debug, Clone, PartialEq)]
pub struct OrderCreated {
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    pub user_id: UserId,
    pub total_amount: Money,
    pub item_count: usize,
    pub occurred_at: DateTime<Utc>,
}

/// 注文ステータス更新イベント
#[derive(Debug, Clone, PartialEq)]
pub struct OrderStatusChanged {
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    pub user_id: UserId,
    pub previous_status: OrderStatus,
    pub new_status: OrderStatus,
    pub occurred_at: DateTime<Utc>,
}

/// 注文キャンセルイベント
#[derive(Debug, Clone, PartialEq)]
pub struct OrderCancelled {
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}
