// 出力ポート
// ドメイン層が外部に依存する機能をトレイトとして定義
// アダプター層でこれらのトレイトを実装する

use crate::domain::error::DomainError;
use crate::domain::model::{
    Activity, Money, Order, OrderId, OrderItemId, Product, ProductId, User, UserId,
};
use async_trait::async_trait;

/// リポジトリエラー型
/// リポジトリ操作で発生するエラーを表現する
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[allow(clippy::enum_variant_names)]
pub enum RepositoryError {
    /// データベース接続に失敗
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    /// 操作に失敗
    #[error("Operation failed: {0}")]
    OperationFailed(String),
    /// データの取得に失敗
    #[error("Fetch failed: {0}")]
    FetchFailed(String),
    /// 同時更新の競合（バージョン不一致）
    #[error("Concurrent modification: {0}")]
    Conflict(String),
    /// 一意制約違反
    #[error("Duplicate key: {0}")]
    Duplicate(String),
}

/// 注文リポジトリトレイト
/// 注文集約（注文＋明細）の永続化を抽象化する
/// 1つの集約の書き込みはアトミックに行われる
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// 新しい注文を明細と共に保存する
    ///
    /// # Returns
    /// * `Ok(())` - 保存成功
    /// * `Err(RepositoryError::Duplicate)` - 注文番号またはIDが既に存在する
    /// * `Err(RepositoryError)` - 保存失敗
    async fn create(&self, order: &Order) -> Result<(), RepositoryError>;

    /// 注文IDで注文を検索する
    ///
    /// # Returns
    /// * `Ok(Some(Order))` - 注文が見つかった
    /// * `Ok(None)` - 注文が見つからなかった
    /// * `Err(RepositoryError)` - 検索失敗
    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// すべての注文を注文日時の降順で取得する
    async fn find_all(&self) -> Result<Vec<Order>, RepositoryError>;

    /// 指定ユーザーの注文を注文日時の降順で取得する
    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError>;

    /// 既存の注文を更新する
    /// 保存済みのバージョンが `order.version()` と一致する場合のみ書き込み、バージョンを1つ進める
    ///
    /// # Returns
    /// * `Ok(())` - 更新成功
    /// * `Err(RepositoryError::Conflict)` - バージョン不一致または行が存在しない
    /// * `Err(RepositoryError)` - 更新失敗
    async fn update(&self, order: &Order) -> Result<(), RepositoryError>;

    /// 新しい一意の注文IDを生成する
    fn next_identity(&self) -> OrderId {
        OrderId::new()
    }
}

/// 在庫台帳のエラー
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    /// 商品が存在しない、または無効化されている
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),
    /// 在庫不足
    #[error("Insufficient stock for product {name}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        name: String,
        requested: u32,
        available: u32,
    },
    /// 数量が不正（1未満）
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(u32),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl LedgerError {
    /// 商品の在庫操作で発生したドメインエラーを台帳エラーに変換する
    pub fn from_domain(product: &Product, quantity: u32, err: DomainError) -> Self {
        match err {
            DomainError::InsufficientStock {
                requested,
                available,
            } => LedgerError::InsufficientStock {
                product_id: product.id(),
                name: product.name().to_string(),
                requested,
                available,
            },
            DomainError::InvalidQuantity => LedgerError::InvalidQuantity(quantity),
            other => LedgerError::Repository(RepositoryError::OperationFailed(other.to_string())),
        }
    }
}

/// 在庫台帳トレイト
/// 商品ごとの在庫数を所有し、予約と解放をアトミックに行う
///
/// 同一商品に対する `reserve` の在庫確認と減算は、任意のインターリーブのもとで
/// 在庫数が負にならないよう直列化されなければならない
#[async_trait]
pub trait InventoryLedger: Send + Sync {
    /// 在庫を予約する
    ///
    /// # Returns
    /// * `Ok(Money)` - 予約時点の単価
    /// * `Err(LedgerError::ProductNotFound)` - 商品が存在しないか無効
    /// * `Err(LedgerError::InsufficientStock)` - 在庫不足
    async fn reserve(&self, product_id: ProductId, quantity: u32) -> Result<Money, LedgerError>;

    /// 在庫を解放する
    /// 重複排除は行わない。呼び出し側は1つの予約につき最大1回だけ呼ぶこと
    async fn release(&self, product_id: ProductId, quantity: u32) -> Result<(), LedgerError>;

    /// 注文明細の在庫を解放し、明細IDを解放済みとして記録する
    /// 在庫の加算と記録は同じ商品ロックの中で行われ、同じ明細の2回目以降は在庫を変更しない
    /// 無効化された商品でも解放できる
    ///
    /// # Returns
    /// * `Ok(true)` - 今回解放した
    /// * `Ok(false)` - 既に解放済みだった
    async fn release_line(
        &self,
        item_id: OrderItemId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<bool, LedgerError>;

    /// `release_line` で解放した在庫を取り戻し、解放記録を削除する
    /// 商品の有効・無効は問わない。記録がない明細には何もしない
    ///
    /// # Returns
    /// * `Ok(())` - 取り戻した、または記録がなかった
    /// * `Err(LedgerError::InsufficientStock)` - 解放後に他の注文が在庫を使った。記録は残る
    async fn reclaim_line(
        &self,
        item_id: OrderItemId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), LedgerError>;

    /// 商品を検索する（無効化された商品も含む）
    async fn find_product(&self, product_id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// 商品を保存する（カタログ管理・テストデータ投入用）
    async fn save_product(&self, product: &Product) -> Result<(), RepositoryError>;
}

/// ユーザーリポジトリトレイト
/// 注文の表示用にユーザー情報を参照する
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, user_id: UserId) -> Result<Option<User>, RepositoryError>;
}

/// トークンエラー
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TokenError {
    /// 署名不正・形式不正・期限切れなど
    #[error("Invalid token: {0}")]
    Invalid(String),
    /// トークン発行に失敗
    #[error("Token issuance failed: {0}")]
    IssuanceFailed(String),
}

/// トークンサービストレイト
/// ユーザーに紐づく不透明なベアラートークンを発行・検証する
pub trait TokenService: Send + Sync {
    /// ユーザーのトークンを発行する
    fn issue(&self, user: &User) -> Result<String, TokenError>;

    /// トークンを検証し、ユーザーIDを返す
    fn verify(&self, token: &str) -> Result<UserId, TokenError>;
}

/// 活動履歴レコーダートレイト
#[async_trait]
pub trait ActivityRecorder: Send + Sync {
    async fn record(&self, activity: &Activity) -> Result<(), RepositoryError>;
}
