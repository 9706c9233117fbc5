use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, Pool, Row};

use crate::adapter::database_error::DatabaseError;
use crate::domain::model::{
    Money, Order, OrderId, OrderItem, OrderItemId, OrderNumber, OrderRecord, OrderStatus,
    ProductId, ShippingAddress, UserId,
};
use crate::domain::port::{OrderRepository, RepositoryError};

const SELECT_ORDERS: &str = r#"
    SELECT
        o.id, o.order_number, o.user_id, o.shipping_address, o.phone, o.notes,
        o.total_amount, o.total_currency, o.status,
        o.order_date, o.shipped_date, o.delivered_date, o.created_at, o.updated_at, o.version,
        oi.id AS item_id, oi.product_id, oi.quantity,
        oi.unit_price_amount, oi.unit_price_currency
    FROM orders o
    JOIN order_items oi ON o.id = oi.order_id
"#;

const ORDER_BY_NEWEST: &str = "ORDER BY o.order_date DESC, o.id, oi.line_no";

fn query_failed(context: &str) -> impl Fn(sqlx::Error) -> RepositoryError + '_ {
    move |e| RepositoryError::from(DatabaseError::from_sqlx(context, e))
}

fn fetch_failed<E: std::fmt::Display>(what: &str) -> impl Fn(E) -> RepositoryError + '_ {
    move |e| RepositoryError::FetchFailed(format!("{}の解析に失敗しました: {}", what, e))
}

/// MySQL注文リポジトリ
/// ordersテーブルとorder_itemsテーブルに注文集約を永続化する
pub struct MySqlOrderRepository {
    pool: Pool<MySql>,
}

impl MySqlOrderRepository {
    /// 新しいMySQL注文リポジトリを作成
    ///
    /// # Arguments
    /// * `pool` - MySQLコネクションプール
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    async fn fetch_orders(
        &self,
        filter: &str,
        bind: Option<String>,
    ) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!("{} {} {}", SELECT_ORDERS, filter, ORDER_BY_NEWEST);
        let mut query = sqlx::query(&sql);
        if let Some(value) = bind {
            query = query.bind(value);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(query_failed("注文の取得に失敗しました"))?;
        Self::build_orders_from_rows(&rows)
    }

    /// JOINされた行から注文集約を再構築する
    /// 行は注文ごとに連続しているため、並び順をそのまま保つ
    fn build_orders_from_rows(rows: &[MySqlRow]) -> Result<Vec<Order>, RepositoryError> {
        let mut groups: Vec<(String, Vec<&MySqlRow>)> = Vec::new();
        for row in rows {
            let id: String = row.try_get("id").map_err(fetch_failed("注文ID"))?;
            if let Some((last_id, group)) = groups.last_mut() {
                if *last_id == id {
                    group.push(row);
                    continue;
                }
            }
            groups.push((id, vec![row]));
        }

        groups
            .into_iter()
            .map(|(id, group)| Self::build_order(&id, &group))
            .collect()
    }

    fn build_order(id: &str, rows: &[&MySqlRow]) -> Result<Order, RepositoryError> {
        let first = rows
            .first()
            .ok_or_else(|| RepositoryError::FetchFailed(format!("注文 {} の行がありません", id)))?;

        let items = rows
            .iter()
            .map(|row| Self::build_item(row))
            .collect::<Result<Vec<_>, _>>()?;

        let total_amount = Money::new(
            first.try_get("total_amount").map_err(fetch_failed("合計金額"))?,
            first
                .try_get::<String, _>("total_currency")
                .map_err(fetch_failed("通貨"))?
                .as_str(),
        )
        .map_err(fetch_failed("合計金額"))?;

        let status_str: String = first.try_get("status").map_err(fetch_failed("注文ステータス"))?;

        let record = OrderRecord {
            id: OrderId::from_string(id).map_err(fetch_failed("注文ID"))?,
            order_number: OrderNumber::from_string(
                first.try_get("order_number").map_err(fetch_failed("注文番号"))?,
            )
            .map_err(fetch_failed("注文番号"))?,
            user_id: UserId::from_string(
                &first.try_get::<String, _>("user_id").map_err(fetch_failed("ユーザーID"))?,
            )
            .map_err(fetch_failed("ユーザーID"))?,
            shipping_address: ShippingAddress::new(
                first.try_get("shipping_address").map_err(fetch_failed("配送先"))?,
                first.try_get("phone").map_err(fetch_failed("電話番号"))?,
            )
            .map_err(fetch_failed("配送先"))?,
            notes: first.try_get("notes").map_err(fetch_failed("メモ"))?,
            items,
            total_amount,
            status: OrderStatus::from_string(&status_str).map_err(fetch_failed("注文ステータス"))?,
            order_date: first.try_get("order_date").map_err(fetch_failed("注文日時"))?,
            shipped_date: first
                .try_get::<Option<DateTime<Utc>>, _>("shipped_date")
                .map_err(fetch_failed("発送日時"))?,
            delivered_date: first
                .try_get::<Option<DateTime<Utc>>, _>("delivered_date")
                .map_err(fetch_failed("配達日時"))?,
            created_at: first.try_get("created_at").map_err(fetch_failed("作成日時"))?,
            updated_at: first.try_get("updated_at").map_err(fetch_failed("更新日時"))?,
            version: first.try_get("version").map_err(fetch_failed("バージョン"))?,
        };

        Order::reconstruct(record).map_err(|e| {
            RepositoryError::FetchFailed(format!("注文集約の再構築に失敗しました: {}", e))
        })
    }

    fn build_item(row: &MySqlRow) -> Result<OrderItem, RepositoryError> {
        let item_id: String = row.try_get("item_id").map_err(fetch_failed("明細ID"))?;
        let product_id: String = row.try_get("product_id").map_err(fetch_failed("商品ID"))?;
        let currency: String = row
            .try_get("unit_price_currency")
            .map_err(fetch_failed("通貨"))?;
        let unit_price = Money::new(
            row.try_get("unit_price_amount").map_err(fetch_failed("単価"))?,
            &currency,
        )
        .map_err(fetch_failed("単価"))?;

        OrderItem::reconstruct(
            OrderItemId::from_string(&item_id).map_err(fetch_failed("明細ID"))?,
            ProductId::from_string(&product_id).map_err(fetch_failed("商品ID"))?,
            row.try_get("quantity").map_err(fetch_failed("数量"))?,
            unit_price,
        )
        .map_err(|e| RepositoryError::FetchFailed(format!("注文明細の構築に失敗しました: {}", e)))
    }
}

#[async_trait]
impl OrderRepository for MySqlOrderRepository {
    async fn create(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(query_failed("トランザクション開始に失敗しました"))?;

        let address = order.shipping_address();
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, order_number, user_id, shipping_address, phone, notes,
                total_amount, total_currency, status,
                order_date, shipped_date, delivered_date, created_at, updated_at, version
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(order.id().to_string())
        .bind(order.order_number().as_str())
        .bind(order.user_id().to_string())
        .bind(address.address())
        .bind(address.phone())
        .bind(order.notes())
        .bind(order.total_amount().amount())
        .bind(order.total_amount().currency())
        .bind(order.status().to_string())
        .bind(order.order_date())
        .bind(order.shipped_date())
        .bind(order.delivered_date())
        .bind(order.created_at())
        .bind(order.updated_at())
        .bind(order.version())
        .execute(&mut *tx)
        .await
        .map_err(query_failed("注文の保存に失敗しました"))?;

        for (line_no, item) in order.items().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (
                    id, order_id, line_no, product_id, quantity,
                    unit_price_amount, unit_price_currency, total_price_amount
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(item.id().to_string())
            .bind(order.id().to_string())
            .bind(line_no as u32)
            .bind(item.product_id().to_string())
            .bind(item.quantity())
            .bind(item.unit_price().amount())
            .bind(item.unit_price().currency())
            .bind(item.total_price().amount())
            .execute(&mut *tx)
            .await
            .map_err(query_failed("注文明細の保存に失敗しました"))?;
        }

        tx.commit()
            .await
            .map_err(query_failed("トランザクションのコミットに失敗しました"))?;

        Ok(())
    }

    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let orders = self
            .fetch_orders("WHERE o.id = ?", Some(order_id.to_string()))
            .await?;
        Ok(orders.into_iter().next())
    }

    async fn find_all(&self) -> Result<Vec<Order>, RepositoryError> {
        self.fetch_orders("", None).await
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        self.fetch_orders("WHERE o.user_id = ?", Some(user_id.to_string()))
            .await
    }

    async fn update(&self, order: &Order) -> Result<(), RepositoryError> {
        // 明細は作成後に変更されないため、注文行のみ更新する
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = ?, notes = ?, shipped_date = ?, delivered_date = ?,
                updated_at = ?, version = version + 1
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(order.status().to_string())
        .bind(order.notes())
        .bind(order.shipped_date())
        .bind(order.delivered_date())
        .bind(order.updated_at())
        .bind(order.id().to_string())
        .bind(order.version())
        .execute(&self.pool)
        .await
        .map_err(query_failed("注文の更新に失敗しました"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(format!(
                "order {} at version {} was not updated",
                order.id(),
                order.version()
            )));
        }
        Ok(())
    }
}
