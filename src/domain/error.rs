/// ドメイン層のエラー型
/// ビジネスルール違反を表現する
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    /// 許可されていない状態遷移（例: 発送済みの注文をキャンセルしようとした）
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
    /// 在庫不足
    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: u32, available: u32 },
    /// 無効な数量（例: 0以下の数量）
    #[error("Invalid quantity")]
    InvalidQuantity,
    /// 注文の検証失敗（例: 注文明細が空）
    #[error("Order validation failed: {0}")]
    OrderValidation(String),
    /// 通貨の不一致
    #[error("Currency mismatch")]
    CurrencyMismatch,
    /// 無効な値
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}
