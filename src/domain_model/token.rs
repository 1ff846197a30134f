use super::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one refresh-token issuance. Never reused; it is the key the
/// session registry revokes by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct TokenId(pub uuid::Uuid);

impl TokenId {
    pub fn generate() -> Self {
        TokenId(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TokenId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::from_str(s).map(TokenId)
    }
}

// Claim names match tokens issued by the previous deployment of this service.
// Those tokens carry no `iat`, so it defaults to zero when absent.

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessClaims {
    #[serde(rename = "UserId")]
    pub user_id: UserId,
    #[serde(default)]
    pub iat: i64,
    pub exp: i64,
}

impl AccessClaims {
    /// Unsigned claims; `iat`/`exp` are stamped by the codec.
    pub fn new(user_id: UserId) -> Self {
        AccessClaims {
            user_id,
            iat: 0,
            exp: 0,
        }
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.iat, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    #[serde(rename = "UUID")]
    pub token_id: TokenId,
    #[serde(rename = "UserId")]
    pub user_id: UserId,
    #[serde(default)]
    pub iat: i64,
    pub exp: i64,
}

impl RefreshClaims {
    /// Unsigned claims; the token id and `iat`/`exp` are stamped by the codec.
    pub fn new(user_id: UserId) -> Self {
        RefreshClaims {
            token_id: TokenId(uuid::Uuid::nil()),
            user_id,
            iat: 0,
            exp: 0,
        }
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.iat, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AccessToken(pub String);

#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RefreshToken(pub String);

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

impl fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RefreshToken([REDACTED])")
    }
}

#[derive(Debug, Clone)]
pub struct SignedAccess {
    pub claims: AccessClaims,
    pub token: AccessToken,
}

#[derive(Debug, Clone)]
pub struct SignedRefresh {
    pub claims: RefreshClaims,
    pub token: RefreshToken,
}
