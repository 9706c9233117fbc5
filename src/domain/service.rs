// ドメインサービス
// 複数の集約にまたがるビジネスロジックを実装

use std::sync::Arc;

use crate::domain::error::DomainError;
use crate::domain::model::{OrderItem, ProductId};
use crate::domain::port::{InventoryLedger, LedgerError};

/// 在庫予約の失敗
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReservationError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// 注文する商品と数量
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestedLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// 在庫サービス
/// 注文作成時の在庫予約、キャンセル時の在庫解放を担当
/// どちらの操作も途中で失敗した場合はそれまでの操作を打ち消してから失敗を返す
pub struct StockReservationService {
    ledger: Arc<dyn InventoryLedger>,
}

impl StockReservationService {
    /// 新しい在庫サービスを作成
    pub fn new(ledger: Arc<dyn InventoryLedger>) -> Self {
        Self { ledger }
    }

    /// 指定された順に全明細の在庫を予約する
    ///
    /// # Returns
    /// * `Ok(Vec<OrderItem>)` - 予約時点の単価で作成された注文明細
    /// * `Err(ReservationError)` - 最初の失敗。それまでの予約は解放済み
    pub async fn reserve_lines(
        &self,
        lines: &[RequestedLine],
    ) -> Result<Vec<OrderItem>, ReservationError> {
        let mut items: Vec<OrderItem> = Vec::with_capacity(lines.len());

        for line in lines {
            let unit_price = match self.ledger.reserve(line.product_id, line.quantity).await {
                Ok(unit_price) => unit_price,
                Err(err) => {
                    self.rollback(&items).await;
                    return Err(err.into());
                }
            };

            match OrderItem::new(line.product_id, line.quantity, unit_price) {
                Ok(item) => items.push(item),
                Err(err) => {
                    // この明細の予約自体は成功しているので一緒に戻す
                    self.release_quietly(line.product_id, line.quantity).await;
                    self.rollback(&items).await;
                    return Err(err.into());
                }
            }
        }

        Ok(items)
    }

    /// 予約済みの明細をすべて解放する（作成失敗時のロールバック）
    /// 個々の解放失敗はログに残し、処理は続行する
    pub async fn rollback(&self, items: &[OrderItem]) {
        for item in items.iter().rev() {
            self.release_quietly(item.product_id(), item.quantity()).await;
        }
    }

    /// 注文明細の在庫をすべて解放する（キャンセル時）
    /// 台帳は明細ごとに解放を記録するため、解放済みの明細は再度解放されない
    ///
    /// # Returns
    /// * `Ok(())` - 全明細の解放成功
    /// * `Err(LedgerError)` - 解放失敗。今回解放した分は取り戻し済み
    pub async fn release_items(&self, items: &[OrderItem]) -> Result<(), LedgerError> {
        let mut released: Vec<&OrderItem> = Vec::with_capacity(items.len());
        for item in items {
            match self
                .ledger
                .release_line(item.id(), item.product_id(), item.quantity())
                .await
            {
                Ok(true) => released.push(item),
                Ok(false) => {
                    tracing::warn!(
                        item_id = %item.id(),
                        product_id = %item.product_id(),
                        "明細の在庫は既に解放済みです"
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        product_id = %item.product_id(),
                        error = %err,
                        "在庫の解放に失敗しました。解放済みの在庫を戻します"
                    );
                    self.reclaim(released).await;
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    /// 解放済みの在庫を取り戻す（キャンセルの補償処理）
    /// 取り戻せなかった明細は解放記録が残るので、キャンセルの再試行で二重に解放されない
    pub async fn reclaim<'a, I>(&self, items: I)
    where
        I: IntoIterator<Item = &'a OrderItem>,
    {
        for item in items {
            if let Err(err) = self
                .ledger
                .reclaim_line(item.id(), item.product_id(), item.quantity())
                .await
            {
                tracing::error!(
                    item_id = %item.id(),
                    product_id = %item.product_id(),
                    quantity = item.quantity(),
                    error = %err,
                    "在庫の補償処理に失敗しました。明細は解放済みのまま残ります"
                );
            }
        }
    }

    async fn release_quietly(&self, product_id: ProductId, quantity: u32) {
        if let Err(err) = self.ledger.release(product_id, quantity).await {
            tracing::error!(
                product_id = %product_id,
                quantity,
                error = %err,
                "予約のロールバックに失敗しました。在庫数が不整合です"
            );
        }
    }
}
