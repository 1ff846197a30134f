use super::util::is_dup_key;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use sqlx::MySqlPool;
use std::sync::Arc;

pub struct MySqlSessionRegistry {
    pool: MySqlPool,
    clock: Arc<dyn Clock>,
}

impl MySqlSessionRegistry {
    pub fn new(pool: MySqlPool, clock: Arc<dyn Clock>) -> Self {
        MySqlSessionRegistry { pool, clock }
    }
}

#[async_trait::async_trait]
impl SessionRegistry for MySqlSessionRegistry {
    async fn add(&self, record: RefreshSessionRecord) -> Result<(), AuthError> {
        sqlx::query(
            r#"
INSERT INTO refresh_tokens (token_id, user_id, token, ip, created_at, updated_at, expires_at)
VALUES (?, ?, ?, ?, ?, ?, ?)
"#,
        )
        .bind(record.token_id)
        .bind(record.user_id)
        .bind(&record.token)
        .bind(&record.ip)
        .bind(record.created_at)
        .bind(record.updated_at)
        .bind(record.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_dup_key(&e) {
                AuthError::Conflict(format!("refresh token {} already recorded", record.token_id))
            } else {
                AuthError::Store(e.to_string())
            }
        })?;

        Ok(())
    }

    async fn exists(&self, binding: &SessionBinding<'_>) -> Result<bool, AuthError> {
        let count: i64 = sqlx::query_scalar(
            r#"
SELECT COUNT(1)
FROM refresh_tokens
WHERE token_id = ? AND user_id = ? AND ip = ? AND token = ?
"#,
        )
        .bind(binding.token_id)
        .bind(binding.user_id)
        .bind(binding.ip)
        .bind(binding.token)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(count > 0)
    }

    async fn consume(&self, binding: &SessionBinding<'_>) -> Result<bool, AuthError> {
        // Single conditional DELETE: the row lock serializes concurrent callers.
        let result = sqlx::query(
            r#"
DELETE FROM refresh_tokens
WHERE token_id = ? AND user_id = ? AND ip = ? AND token = ?
"#,
        )
        .bind(binding.token_id)
        .bind(binding.user_id)
        .bind(binding.ip)
        .bind(binding.token)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, token_id: TokenId) -> Result<(), AuthError> {
        sqlx::query("DELETE FROM refresh_tokens WHERE token_id = ?")
            .bind(token_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;
        Ok(())
    }

    async fn delete_all_for_user(&self, user_id: UserId) -> Result<(), AuthError> {
        sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;
        Ok(())
    }

    async fn count_for_user(&self, user_id: UserId) -> Result<usize, AuthError> {
        let now = self.clock.now();

        sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ? AND expires_at <= ?")
            .bind(user_id)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::Store(format!("prune expired sessions: {e}")))?;

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM refresh_tokens WHERE user_id = ?")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| AuthError::Store(e.to_string()))?;

        usize::try_from(count).map_err(|e| AuthError::Store(e.to_string()))
    }
}
