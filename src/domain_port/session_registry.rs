use crate::application_port::*;
use crate::domain_model::*;

/// Durable record of outstanding refresh tokens.
#[async_trait::async_trait]
pub trait SessionRegistry: Send + Sync {
    /// Insert a record. A duplicate token id is [`AuthError::Conflict`].
    async fn add(&self, record: RefreshSessionRecord) -> Result<(), AuthError>;

    /// True only when a record matches all four fields of `binding`.
    async fn exists(&self, binding: &SessionBinding<'_>) -> Result<bool, AuthError>;

    /// Atomic `exists` + `delete`. Among concurrent callers presenting the
    /// same binding at most one observes `true`.
    async fn consume(&self, binding: &SessionBinding<'_>) -> Result<bool, AuthError>;

    /// Deleting an unknown id is not an error.
    async fn delete(&self, token_id: TokenId) -> Result<(), AuthError>;

    async fn delete_all_for_user(&self, user_id: UserId) -> Result<(), AuthError>;

    /// Number of outstanding, unexpired records for the user.
    async fn count_for_user(&self, user_id: UserId) -> Result<usize, AuthError>;
}
