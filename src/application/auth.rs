use std::sync::Arc;

use crate::application::ApplicationError;
use crate::domain::model::UserId;
use crate::domain::port::TokenService;

const BEARER_PREFIX: &str = "Bearer ";

/// 認可ゲート
/// Authorizationヘッダーの値から呼び出し元のユーザーを特定する
/// トークンやセッションの状態は変更しない
#[derive(Clone)]
pub struct AuthorizationGate {
    token_service: Arc<dyn TokenService>,
}

impl AuthorizationGate {
    pub fn new(token_service: Arc<dyn TokenService>) -> Self {
        Self { token_service }
    }

    /// ヘッダー値 `"Bearer <token>"` を検証してユーザーIDを返す
    ///
    /// # Returns
    /// * `Ok(UserId)` - 認証済みのユーザー
    /// * `Err(ApplicationError::Unauthenticated)` - ヘッダーが無い・形式不正・トークン無効
    pub fn authenticate(&self, authorization: Option<&str>) -> Result<UserId, ApplicationError> {
        let token = authorization
            .and_then(|value| value.strip_prefix(BEARER_PREFIX))
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ApplicationError::Unauthenticated("token is required".to_string()))?;

        self.token_service.verify(token).map_err(|err| {
            tracing::debug!(error = %err, "token verification failed");
            ApplicationError::Unauthenticated("invalid token".to_string())
        })
    }

    /// 呼び出し元がリソースの所有者であることを確認する
    pub fn ensure_owner(caller: UserId, owner: UserId) -> Result<(), ApplicationError> {
        if caller != owner {
            return Err(ApplicationError::Forbidden(
                "only the owner may perform this operation".to_string(),
            ));
        }
        Ok(())
    }
}
