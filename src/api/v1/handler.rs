use super::error::rejection;
use crate::application_port::*;
use crate::domain_model::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use warp::http::StatusCode;

#[derive(Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SettingsPayload {
    pub currency: String,
}

#[derive(Debug, Serialize)]
pub struct TokenPairResponse {
    pub access: AccessToken,
    pub refresh: RefreshToken,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

impl From<AuthTokens> for TokenPairResponse {
    fn from(tokens: AuthTokens) -> Self {
        TokenPairResponse {
            access: tokens.access_token,
            refresh: tokens.refresh_token,
            access_expires_at: tokens.access_token_expires_at,
            refresh_expires_at: tokens.refresh_token_expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub uuid: UserId,
    pub email: String,
    pub name: String,
    pub settings: SettingsPayload,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            uuid: user.id,
            email: user.email,
            name: user.name,
            settings: SettingsPayload {
                currency: user.settings.currency.code().to_string(),
            },
        }
    }
}

/// Client address for session binding. Proxy headers are trusted, so the
/// service must sit behind a proxy that sets them.
pub fn resolve_client_ip(
    real_ip: Option<&str>,
    forwarded_for: Option<&str>,
    remote: Option<SocketAddr>,
) -> String {
    let non_empty = |s: &str| {
        let s = s.trim();
        (!s.is_empty()).then(|| s.to_string())
    };

    real_ip
        .and_then(non_empty)
        .or_else(|| forwarded_for.and_then(|v| v.split(',').next()).and_then(non_empty))
        .or_else(|| remote.map(|addr| addr.ip().to_string()))
        .unwrap_or_default()
}

pub async fn health() -> Result<impl warp::Reply, warp::Rejection> {
    Ok(warp::reply::json(&serde_json::json!({ "status": "ok" })))
}

pub async fn sign_in(
    body: SignInRequest,
    ip: String,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let input = SignInInput {
        email: body.email,
        password: body.password,
        ip,
    };
    let tokens = auth_service.sign_in(input).await.map_err(rejection)?;
    Ok(warp::reply::json(&TokenPairResponse::from(tokens)))
}

pub async fn sign_up(
    body: SignUpRequest,
    ip: String,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let input = SignUpInput {
        email: body.email,
        password: body.password,
        name: body.name,
        ip,
    };
    let tokens = auth_service.sign_up(input).await.map_err(rejection)?;
    Ok(warp::reply::json(&TokenPairResponse::from(tokens)))
}

pub async fn refresh(
    body: RefreshRequest,
    ip: String,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    if body.refresh.is_empty() {
        return Err(rejection(AuthError::InvalidToken));
    }
    let tokens = auth_service
        .refresh(&body.refresh, &ip)
        .await
        .map_err(rejection)?;
    Ok(warp::reply::json(&TokenPairResponse::from(tokens)))
}

pub async fn logout(
    body: RefreshRequest,
    ip: String,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    if body.refresh.is_empty() {
        return Err(rejection(AuthError::InvalidToken));
    }
    auth_service
        .logout(&body.refresh, &ip)
        .await
        .map_err(rejection)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn logout_all(
    user_id: UserId,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    auth_service.logout_all(user_id).await.map_err(rejection)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(
    user_id: UserId,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user = auth_service.get_user(user_id).await.map_err(rejection)?;
    Ok(warp::reply::json(&UserResponse::from(user)))
}

pub async fn update_settings(
    user_id: UserId,
    body: SettingsPayload,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let input = UpdateSettingsInput {
        user_id,
        currency: body.currency,
    };
    let user = auth_service
        .update_settings(input)
        .await
        .map_err(rejection)?;
    Ok(warp::reply::json(&UserResponse::from(user)))
}
