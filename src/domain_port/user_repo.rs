use crate::application_port::*;
use crate::domain_model::*;

/// User store. Lookups report a miss as [`AuthError::NotFound`].
#[async_trait::async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_by_id(&self, user_id: UserId) -> Result<User, AuthError>;

    async fn find_by_email(&self, email: &str) -> Result<User, AuthError>;

    /// Fails with [`AuthError::Conflict`] if the id or email is taken.
    async fn add(&self, user: &User) -> Result<(), AuthError>;

    async fn update_settings(
        &self,
        user_id: UserId,
        settings: UserSettings,
    ) -> Result<User, AuthError>;
}
