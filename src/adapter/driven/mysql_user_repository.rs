use async_trait::async_trait;
use sqlx::{MySql, Pool, Row};

use crate::adapter::database_error::DatabaseError;
use crate::domain::model::{User, UserId};
use crate::domain::port::{RepositoryError, UserRepository};

/// MySQLユーザーリポジトリ
/// 注文の表示に必要な範囲でユーザーを参照する
pub struct MySqlUserRepository {
    pool: Pool<MySql>,
}

impl MySqlUserRepository {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for MySqlUserRepository {
    async fn find_by_id(&self, user_id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query("SELECT id, name, email FROM users WHERE id = ?")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::from_sqlx("ユーザーの取得に失敗しました", e))
            .map_err(RepositoryError::from)?;

        match row {
            Some(row) => {
                let name: String = row
                    .try_get("name")
                    .map_err(|e| RepositoryError::FetchFailed(e.to_string()))?;
                let email: String = row
                    .try_get("email")
                    .map_err(|e| RepositoryError::FetchFailed(e.to_string()))?;
                Ok(Some(User::new(user_id, name, email)))
            }
            None => Ok(None),
        }
    }
}
