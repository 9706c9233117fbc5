use crate::domain::error::DomainError;
use crate::domain::port::{LedgerError, RepositoryError};
use crate::domain::service::ReservationError;

/// アプリケーション層のエラー型
/// 呼び出し元にそのまま区別して返されるエラー分類
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApplicationError {
    /// トークンが無い・形式不正・無効
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),
    /// 認証済みだが操作が許可されていない（例: 他人の注文のキャンセル）
    #[error("Forbidden: {0}")]
    Forbidden(String),
    /// 注文・商品・ユーザーが見つからない
    #[error("Not found: {0}")]
    NotFound(String),
    /// 入力検証エラー
    #[error("Validation error: {0}")]
    Validation(String),
    /// 在庫不足
    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),
    /// 許可されていない状態遷移
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
    /// リポジトリエラー（永続化の失敗）
    #[error("Repository error: {0}")]
    Repository(RepositoryError),
}

// From実装でエラー変換を簡潔に
impl From<DomainError> for ApplicationError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidTransition(msg) => ApplicationError::InvalidTransition(msg),
            DomainError::InsufficientStock { .. } => {
                ApplicationError::InsufficientStock(err.to_string())
            }
            DomainError::InvalidQuantity
            | DomainError::OrderValidation(_)
            | DomainError::CurrencyMismatch
            | DomainError::InvalidValue(_) => ApplicationError::Validation(err.to_string()),
        }
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(err: RepositoryError) -> Self {
        ApplicationError::Repository(err)
    }
}

impl From<LedgerError> for ApplicationError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::ProductNotFound(product_id) => {
                ApplicationError::NotFound(format!("商品が見つかりません: {}", product_id))
            }
            LedgerError::InsufficientStock { .. } => {
                ApplicationError::InsufficientStock(err.to_string())
            }
            LedgerError::InvalidQuantity(_) => ApplicationError::Validation(err.to_string()),
            LedgerError::Repository(repo_err) => ApplicationError::Repository(repo_err),
        }
    }
}

impl From<ReservationError> for ApplicationError {
    fn from(err: ReservationError) -> Self {
        match err {
            ReservationError::Ledger(err) => err.into(),
            ReservationError::Domain(err) => err.into(),
        }
    }
}
