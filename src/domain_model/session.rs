use super::{TokenId, UserId};
use chrono::{DateTime, Utc};
use std::fmt;

/// One outstanding refresh token. Exists iff the token has been neither
/// rotated, revoked nor purged by the session cap.
#[derive(Clone)]
pub struct RefreshSessionRecord {
    pub token_id: TokenId,
    pub user_id: UserId,
    pub token: String,
    pub ip: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl RefreshSessionRecord {
    pub fn matches(&self, binding: &SessionBinding<'_>) -> bool {
        self.token_id == binding.token_id
            && self.user_id == binding.user_id
            && self.ip == binding.ip
            && self.token == binding.token
    }
}

impl fmt::Debug for RefreshSessionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshSessionRecord")
            .field("token_id", &self.token_id)
            .field("user_id", &self.user_id)
            .field("token", &"[REDACTED]")
            .field("ip", &self.ip)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// The four fields a presented refresh token must match exactly.
#[derive(Clone, Copy)]
pub struct SessionBinding<'a> {
    pub token_id: TokenId,
    pub user_id: UserId,
    pub ip: &'a str,
    pub token: &'a str,
}

impl fmt::Debug for SessionBinding<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionBinding")
            .field("token_id", &self.token_id)
            .field("user_id", &self.user_id)
            .field("ip", &self.ip)
            .finish_non_exhaustive()
    }
}
