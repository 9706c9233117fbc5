use chrono::{DateTime, Utc};
use std::fmt;

use crate::domain::event::DomainEvent;
use crate::domain::model::{OrderId, UserId};

/// 活動種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityType {
    OrderCreated,
    OrderUpdated,
    OrderCancelled,
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActivityType::OrderCreated => "OrderCreated",
            ActivityType::OrderUpdated => "OrderUpdated",
            ActivityType::OrderCancelled => "OrderCancelled",
        };
        write!(f, "{}", s)
    }
}

/// 活動履歴（riwayat）の1件
#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    pub user_id: UserId,
    pub order_id: OrderId,
    pub activity_type: ActivityType,
    pub description: String,
    pub details: String,
    pub activity_date: DateTime<Utc>,
}

impl Activity {
    /// ドメインイベントから活動履歴を作成
    /// `actor` は操作したユーザー
    pub fn from_event(actor: UserId, event: &DomainEvent) -> Self {
        let (activity_type, description, details) = match event {
            DomainEvent::OrderCreated(e) => (
                ActivityType::OrderCreated,
                format!("Order {} created", e.order_number),
                format!(
                    "items={}, total={} {}",
                    e.item_count,
                    e.total_amount.amount(),
                    e.total_amount.currency()
                ),
            ),
            DomainEvent::OrderStatusChanged(e) => (
                ActivityType::OrderUpdated,
                format!("Order {} status updated", e.order_number),
                format!("{} -> {}", e.previous_status, e.new_status),
            ),
            DomainEvent::OrderCancelled(e) => (
                ActivityType::OrderCancelled,
                format!("Order {} cancelled", e.order_number),
                String::new(),
            ),
        };

        Self {
            user_id: actor,
            order_id: event.order_id(),
            activity_type,
            description,
            details,
            activity_date: event.occurred_at(),
        }
    }
}
