use super::util::is_dup_key;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use std::sync::Arc;

pub struct MySqlUserRepo {
    pool: MySqlPool,
    clock: Arc<dyn Clock>,
}

impl MySqlUserRepo {
    pub fn new(pool: MySqlPool, clock: Arc<dyn Clock>) -> Self {
        MySqlUserRepo { pool, clock }
    }

    fn row_to_user(row: MySqlRow) -> Result<User, AuthError> {
        let id: UserId = row
            .try_get("user_id")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let email: String = row
            .try_get("email")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let name: String = row
            .try_get("name")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let password_hash: String = row
            .try_get("password_hash")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let currency: String = row
            .try_get("currency")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let currency = currency
            .parse::<Currency>()
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let created_at: DateTime<Utc> = row
            .try_get("created_at")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let updated_at: DateTime<Utc> = row
            .try_get("updated_at")
            .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(User {
            id,
            email,
            name,
            password_hash,
            settings: UserSettings { currency },
            created_at,
            updated_at,
        })
    }
}

#[async_trait::async_trait]
impl UserRepo for MySqlUserRepo {
    async fn find_by_id(&self, user_id: UserId) -> Result<User, AuthError> {
        let row_opt: Option<MySqlRow> = sqlx::query(
            r#"
SELECT user_id, email, name, password_hash, currency, created_at, updated_at
FROM users
WHERE user_id = ?
"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::Store(format!("query user by id: {e}")))?;

        row_opt.map(Self::row_to_user).unwrap_or(Err(AuthError::NotFound))
    }

    async fn find_by_email(&self, email: &str) -> Result<User, AuthError> {
        let row_opt: Option<MySqlRow> = sqlx::query(
            r#"
SELECT user_id, email, name, password_hash, currency, created_at, updated_at
FROM users
WHERE email = ?
"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::Store(format!("query user by email: {e}")))?;

        row_opt.map(Self::row_to_user).unwrap_or(Err(AuthError::NotFound))
    }

    async fn add(&self, user: &User) -> Result<(), AuthError> {
        sqlx::query(
            r#"
INSERT INTO users (user_id, email, name, password_hash, currency, created_at, updated_at)
VALUES (?, ?, ?, ?, ?, ?, ?)
"#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.settings.currency.code())
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_dup_key(&e) {
                AuthError::Conflict("user already exists".to_string())
            } else {
                AuthError::Store(e.to_string())
            }
        })?;

        Ok(())
    }

    async fn update_settings(
        &self,
        user_id: UserId,
        settings: UserSettings,
    ) -> Result<User, AuthError> {
        let result = sqlx::query("UPDATE users SET currency = ?, updated_at = ? WHERE user_id = ?")
            .bind(settings.currency.code())
            .bind(self.clock.now())
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::Store(format!("update settings: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(AuthError::NotFound);
        }

        self.find_by_id(user_id).await
    }
}
