use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::service::{CreateOrderCommand, UpdateOrderStatusCommand};
use crate::application::ApplicationError;
use crate::domain::model::{OrderStatus, ProductId};
use crate::domain::service::RequestedLine;

/// 注文明細のリクエストDTO
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    pub quantity: u32,
}

/// 注文作成用のリクエストDTO
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub shipping_address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub notes: String,
    pub order_items: Vec<OrderItemRequest>,
}

impl CreateOrderRequest {
    pub fn into_command(self) -> CreateOrderCommand {
        CreateOrderCommand {
            shipping_address: self.shipping_address,
            phone: self.phone,
            notes: self.notes,
            items: self
                .order_items
                .into_iter()
                .map(|item| RequestedLine {
                    product_id: ProductId::from_uuid(item.product_id),
                    quantity: item.quantity,
                })
                .collect(),
        }
    }
}

/// 注文ステータス更新用のリクエストDTO
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl UpdateOrderStatusRequest {
    /// ステータス文字列を解析してコマンドに変換する（大文字小文字を区別する）
    pub fn into_command(self) -> Result<UpdateOrderStatusCommand, ApplicationError> {
        let status = OrderStatus::from_string(&self.status)?;
        Ok(UpdateOrderStatusCommand {
            status,
            notes: self.notes,
        })
    }
}
