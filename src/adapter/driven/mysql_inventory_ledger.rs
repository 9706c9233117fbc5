use async_trait::async_trait;
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, Pool, Row, Transaction};

use crate::adapter::database_error::DatabaseError;
use crate::domain::model::{Money, OrderItemId, Product, ProductId};
use crate::domain::port::{InventoryLedger, LedgerError, RepositoryError};

fn query_failed(context: &str) -> impl Fn(sqlx::Error) -> RepositoryError + '_ {
    move |e| RepositoryError::from(DatabaseError::from_sqlx(context, e))
}

/// MySQL在庫台帳
/// 予約と解放は `SELECT ... FOR UPDATE` で商品行をロックしたトランザクション内で行う
#[derive(Clone)]
pub struct MySqlInventoryLedger {
    pool: Pool<MySql>,
}

impl MySqlInventoryLedger {
    /// 新しいMySQL在庫台帳を作成
    ///
    /// # Arguments
    /// * `pool` - MySQLコネクションプール
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    fn product_from_row(row: &MySqlRow) -> Result<Product, RepositoryError> {
        let id: String = row
            .try_get("id")
            .map_err(|e| RepositoryError::FetchFailed(format!("商品IDの取得に失敗しました: {}", e)))?;
        let product_id = ProductId::from_string(&id)
            .map_err(|e| RepositoryError::FetchFailed(format!("商品IDの解析に失敗しました: {}", e)))?;
        let currency: String = row
            .try_get("price_currency")
            .map_err(|e| RepositoryError::FetchFailed(e.to_string()))?;
        let price = Money::new(
            row.try_get("price_amount")
                .map_err(|e| RepositoryError::FetchFailed(e.to_string()))?,
            &currency,
        )
        .map_err(|e| RepositoryError::FetchFailed(format!("価格の構築に失敗しました: {}", e)))?;

        Product::reconstruct(
            product_id,
            row.try_get("name")
                .map_err(|e| RepositoryError::FetchFailed(e.to_string()))?,
            price,
            row.try_get("stock")
                .map_err(|e| RepositoryError::FetchFailed(e.to_string()))?,
            row.try_get("is_active")
                .map_err(|e| RepositoryError::FetchFailed(e.to_string()))?,
        )
        .map_err(|e| RepositoryError::FetchFailed(format!("商品の再構築に失敗しました: {}", e)))
    }

    /// 商品行をロックして読み取る
    async fn lock_product(
        tx: &mut Transaction<'_, MySql>,
        product_id: ProductId,
    ) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, price_amount, price_currency, stock, is_active FROM products WHERE id = ? FOR UPDATE",
        )
        .bind(product_id.to_string())
        .fetch_optional(&mut **tx)
        .await
        .map_err(query_failed("商品のロックに失敗しました"))?;

        row.as_ref().map(Self::product_from_row).transpose()
    }

    /// 明細の解放記録が存在するか（商品行のロック中に呼ぶ）
    async fn has_release_record(
        tx: &mut Transaction<'_, MySql>,
        item_id: OrderItemId,
    ) -> Result<bool, RepositoryError> {
        let row = sqlx::query("SELECT order_item_id FROM stock_releases WHERE order_item_id = ?")
            .bind(item_id.to_string())
            .fetch_optional(&mut **tx)
            .await
            .map_err(query_failed("解放記録の取得に失敗しました"))?;
        Ok(row.is_some())
    }

    async fn begin(&self) -> Result<Transaction<'_, MySql>, RepositoryError> {
        self.pool
            .begin()
            .await
            .map_err(query_failed("トランザクション開始に失敗しました"))
    }

    async fn write_stock(
        mut tx: Transaction<'_, MySql>,
        product: &Product,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE products SET stock = ? WHERE id = ?")
            .bind(product.stock())
            .bind(product.id().to_string())
            .execute(&mut *tx)
            .await
            .map_err(query_failed("在庫の更新に失敗しました"))?;

        tx.commit()
            .await
            .map_err(query_failed("トランザクションのコミットに失敗しました"))
    }
}

#[async_trait]
impl InventoryLedger for MySqlInventoryLedger {
    async fn reserve(&self, product_id: ProductId, quantity: u32) -> Result<Money, LedgerError> {
        let mut tx = self.begin().await?;

        let mut product = match Self::lock_product(&mut tx, product_id).await? {
            Some(product) if product.is_active() => product,
            _ => return Err(LedgerError::ProductNotFound(product_id)),
        };

        // 失敗時はtxのドロップでロールバックされる
        let unit_price = product
            .reserve(quantity)
            .map_err(|err| LedgerError::from_domain(&product, quantity, err))?;

        Self::write_stock(tx, &product).await?;
        Ok(unit_price)
    }

    async fn release(&self, product_id: ProductId, quantity: u32) -> Result<(), LedgerError> {
        let mut tx = self.begin().await?;

        let mut product = Self::lock_product(&mut tx, product_id)
            .await?
            .ok_or(LedgerError::ProductNotFound(product_id))?;

        product
            .release(quantity)
            .map_err(|err| LedgerError::from_domain(&product, quantity, err))?;

        Self::write_stock(tx, &product).await?;
        Ok(())
    }

    async fn release_line(
        &self,
        item_id: OrderItemId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<bool, LedgerError> {
        let mut tx = self.begin().await?;

        let mut product = Self::lock_product(&mut tx, product_id)
            .await?
            .ok_or(LedgerError::ProductNotFound(product_id))?;
        if Self::has_release_record(&mut tx, item_id).await? {
            return Ok(false);
        }

        product
            .release(quantity)
            .map_err(|err| LedgerError::from_domain(&product, quantity, err))?;

        sqlx::query("INSERT INTO stock_releases (order_item_id, product_id, quantity) VALUES (?, ?, ?)")
            .bind(item_id.to_string())
            .bind(product_id.to_string())
            .bind(quantity)
            .execute(&mut *tx)
            .await
            .map_err(query_failed("解放記録の保存に失敗しました"))?;

        Self::write_stock(tx, &product).await?;
        Ok(true)
    }

    async fn reclaim_line(
        &self,
        item_id: OrderItemId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), LedgerError> {
        let mut tx = self.begin().await?;

        let mut product = Self::lock_product(&mut tx, product_id)
            .await?
            .ok_or(LedgerError::ProductNotFound(product_id))?;
        if !Self::has_release_record(&mut tx, item_id).await? {
            return Ok(());
        }

        // 無効化された商品でも取り戻す
        product
            .reserve(quantity)
            .map_err(|err| LedgerError::from_domain(&product, quantity, err))?;

        sqlx::query("DELETE FROM stock_releases WHERE order_item_id = ?")
            .bind(item_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(query_failed("解放記録の削除に失敗しました"))?;

        Self::write_stock(tx, &product).await?;
        Ok(())
    }

    async fn find_product(&self, product_id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, price_amount, price_currency, stock, is_active FROM products WHERE id = ?",
        )
        .bind(product_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(query_failed("商品の取得に失敗しました"))?;

        row.as_ref().map(Self::product_from_row).transpose()
    }

    async fn save_product(&self, product: &Product) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, price_amount, price_currency, stock, is_active)
            VALUES (?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                name = VALUES(name),
                price_amount = VALUES(price_amount),
                price_currency = VALUES(price_currency),
                stock = VALUES(stock),
                is_active = VALUES(is_active)
            "#,
        )
        .bind(product.id().to_string())
        .bind(product.name())
        .bind(product.price().amount())
        .bind(product.price().currency())
        .bind(product.stock())
        .bind(product.is_active())
        .execute(&self.pool)
        .await
        .map_err(query_failed("商品の保存に失敗しました"))?;

        Ok(())
    }
}
