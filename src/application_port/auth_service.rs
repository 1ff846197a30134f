use super::AuthError;
use crate::domain_model::*;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct SignInInput {
    pub email: String,
    pub password: String,
    pub ip: String,
}

#[derive(Debug, Clone)]
pub struct SignUpInput {
    pub email: String,
    pub password: String,
    pub name: String,
    pub ip: String,
}

#[derive(Debug, Clone)]
pub struct UpdateSettingsInput {
    pub user_id: UserId,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthTokens {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait TokenCodec: Send + Sync {
    /// Stamps `iat`/`exp` and signs.
    async fn sign_access(&self, claims: AccessClaims) -> Result<SignedAccess, AuthError>;
    /// Stamps a fresh token id plus `iat`/`exp` and signs.
    async fn sign_refresh(&self, claims: RefreshClaims) -> Result<SignedRefresh, AuthError>;
    async fn verify_access(&self, token: &AccessToken) -> Result<AccessClaims, AuthError>;
    async fn verify_refresh(&self, token: &RefreshToken) -> Result<RefreshClaims, AuthError>;
}

#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError>;
    async fn verify_password(&self, password: &str, password_hash: &str)
    -> Result<bool, AuthError>;
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    async fn sign_in(&self, request: SignInInput) -> Result<AuthTokens, AuthError>;
    async fn sign_up(&self, request: SignUpInput) -> Result<AuthTokens, AuthError>;
    /// One-time rotation: the presented token is consumed before a new pair
    /// is issued.
    async fn refresh(&self, refresh_token: &str, ip: &str) -> Result<AuthTokens, AuthError>;
    async fn logout(&self, refresh_token: &str, ip: &str) -> Result<(), AuthError>;
    async fn logout_all(&self, user_id: UserId) -> Result<(), AuthError>;
    async fn validate_access(&self, token: &str) -> Result<AccessClaims, AuthError>;
    async fn get_user(&self, user_id: UserId) -> Result<User, AuthError>;
    async fn update_settings(&self, request: UpdateSettingsInput) -> Result<User, AuthError>;
}
