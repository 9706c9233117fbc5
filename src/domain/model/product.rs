use crate::domain::error::DomainError;
use crate::domain::model::{Money, ProductId};

/// 商品集約（在庫に関わる部分のみ）
/// 在庫数の増減はこの集約を通してのみ行う
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    id: ProductId,
    name: String,
    price: Money,
    stock: u32,
    is_active: bool,
}

impl Product {
    /// 新しい商品を作成
    ///
    /// # Arguments
    /// * `id` - 商品ID
    /// * `name` - 商品名
    /// * `price` - 単価（0以上）
    /// * `stock` - 在庫数
    pub fn new(id: ProductId, name: String, price: Money, stock: u32) -> Result<Self, DomainError> {
        Self::reconstruct(id, name, price, stock, true)
    }

    /// データベースから取得したデータで商品を再構築
    pub fn reconstruct(
        id: ProductId,
        name: String,
        price: Money,
        stock: u32,
        is_active: bool,
    ) -> Result<Self, DomainError> {
        if price.amount() < 0 {
            return Err(DomainError::InvalidValue(
                "価格は0以上である必要があります".to_string(),
            ));
        }
        if name.trim().is_empty() {
            return Err(DomainError::InvalidValue("商品名は空にできません".to_string()));
        }
        Ok(Self {
            id,
            name,
            price,
            stock,
            is_active,
        })
    }

    pub fn id(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn stock(&self) -> u32 {
        self.stock
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// 論理削除（物理削除はしない）
    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    /// 在庫を予約する
    ///
    /// # Returns
    /// * `Ok(Money)` - 予約時点の単価
    /// * `Err(DomainError::InsufficientStock)` - 在庫不足
    pub fn reserve(&mut self, quantity: u32) -> Result<Money, DomainError> {
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity);
        }
        if !self.has_available_stock(quantity) {
            return Err(DomainError::InsufficientStock {
                requested: quantity,
                available: self.stock,
            });
        }
        self.stock -= quantity;
        Ok(self.price)
    }

    /// 在庫を解放する（キャンセル時など）
    pub fn release(&mut self, quantity: u32) -> Result<(), DomainError> {
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity);
        }
        self.stock = self
            .stock
            .checked_add(quantity)
            .ok_or_else(|| DomainError::InvalidValue("在庫数がオーバーフローしました".to_string()))?;
        Ok(())
    }

    /// 指定された数量の在庫が利用可能かチェック
    pub fn has_available_stock(&self, quantity: u32) -> bool {
        self.stock >= quantity
    }
}
