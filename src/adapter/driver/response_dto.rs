use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::service::OrderView;
use crate::domain::model::OrderItem;

/// 注文明細用のレスポンスDTO
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub id: String,
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: i64,
    pub total_price: i64,
}

/// 注文用のレスポンスDTO
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: String,
    pub order_number: String,
    pub user_id: String,
    pub user_name: String,
    pub status: String,
    pub total_amount: i64,
    pub currency: String,
    pub shipping_address: String,
    pub phone: String,
    pub notes: String,
    pub order_date: String,
    pub shipped_date: Option<String>,
    pub delivered_date: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub order_items: Vec<OrderItemResponse>,
}

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339()
}

impl OrderItemResponse {
    fn from_item(item: &OrderItem, product_name: &str) -> Self {
        Self {
            id: item.id().to_string(),
            product_id: item.product_id().to_string(),
            product_name: product_name.to_string(),
            quantity: item.quantity(),
            unit_price: item.unit_price().amount(),
            total_price: item.total_price().amount(),
        }
    }
}

impl OrderResponse {
    /// 名前解決済みの注文からOrderResponseを作成
    pub fn from_view(view: &OrderView) -> Self {
        let order = &view.order;
        let order_items = order
            .items()
            .iter()
            .map(|item| OrderItemResponse::from_item(item, view.product_name(item.product_id())))
            .collect();

        Self {
            id: order.id().to_string(),
            order_number: order.order_number().to_string(),
            user_id: order.user_id().to_string(),
            user_name: view.user_name.clone(),
            status: order.status().to_string(),
            total_amount: order.total_amount().amount(),
            currency: order.total_amount().currency().to_string(),
            shipping_address: order.shipping_address().address().to_string(),
            phone: order.shipping_address().phone().to_string(),
            notes: order.notes().to_string(),
            order_date: rfc3339(order.order_date()),
            shipped_date: order.shipped_date().map(rfc3339),
            delivered_date: order.delivered_date().map(rfc3339),
            created_at: rfc3339(order.created_at()),
            updated_at: rfc3339(order.updated_at()),
            order_items,
        }
    }
}
