use crate::application_port::{AuthError, Clock, TokenCodec};
use crate::domain_model::*;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Tokens above this size are rejected before any parsing.
pub const MAX_TOKEN_BYTES: usize = 8192;

#[derive(Clone)]
pub struct JwtConfig {
    pub secret: Vec<u8>,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

/// Converts a token lifetime to seconds, requiring it to be positive and
/// small enough that `now + ttl` is still a representable timestamp.
pub fn ttl_secs(name: &str, ttl: Duration, now: DateTime<Utc>) -> Result<i64, AuthError> {
    let secs = i64::try_from(ttl.as_secs())
        .ok()
        .filter(|secs| *secs > 0)
        .ok_or_else(|| AuthError::Config(format!("{name} must be a positive number of seconds")))?;
    expiry_after(now.timestamp(), secs)
        .ok_or_else(|| AuthError::Config(format!("{name} of {secs}s is out of range")))?;
    Ok(secs)
}

fn expiry_after(now: i64, ttl_secs: i64) -> Option<i64> {
    now.checked_add(ttl_secs)
        .filter(|exp| DateTime::from_timestamp(*exp, 0).is_some())
}

/// HS256 signer/verifier for access and refresh claims.
///
/// Configuration is checked once in [`JwtHs256Codec::try_new`]; a codec that
/// exists always has a secret and both lifetimes, so signing never reports a
/// configuration problem per request.
pub struct JwtHs256Codec {
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl JwtHs256Codec {
    pub fn try_new(cfg: JwtConfig, clock: Arc<dyn Clock>) -> Result<Self, AuthError> {
        if cfg.secret.is_empty() {
            return Err(AuthError::Config("jwt secret must not be empty".to_string()));
        }
        let now = clock.now();
        let access_ttl_secs = ttl_secs("access ttl", cfg.access_ttl, now)?;
        let refresh_ttl_secs = ttl_secs("refresh ttl", cfg.refresh_ttl, now)?;

        // Expiry is checked against the injected clock, with no leeway.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Ok(JwtHs256Codec {
            access_ttl_secs,
            refresh_ttl_secs,
            encoding_key: EncodingKey::from_secret(&cfg.secret),
            decoding_key: DecodingKey::from_secret(&cfg.secret),
            validation,
            clock,
        })
    }

    fn sign<T: serde::Serialize>(&self, claims: &T) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))
    }

    fn decode_claims<T: DeserializeOwned>(&self, token: &str) -> Result<T, AuthError> {
        if token.len() > MAX_TOKEN_BYTES {
            debug!(len = token.len(), "token rejected: oversized");
            return Err(AuthError::InvalidToken);
        }
        let data = decode::<T>(token, &self.decoding_key, &self.validation).map_err(|e| {
            debug!(error = %e, "token rejected");
            AuthError::InvalidToken
        })?;
        Ok(data.claims)
    }

    /// `(iat, exp)` for a token minted now.
    fn stamp(&self, ttl_secs: i64) -> Result<(i64, i64), AuthError> {
        let now = self.clock.now().timestamp();
        let exp = expiry_after(now, ttl_secs)
            .ok_or_else(|| AuthError::Internal(format!("token expiry overflows at {now}")))?;
        Ok((now, exp))
    }

    fn check_not_expired(&self, exp: i64) -> Result<(), AuthError> {
        let now = self.clock.now().timestamp();
        if now < exp {
            Ok(())
        } else {
            debug!(now, exp, "token rejected: expired");
            Err(AuthError::InvalidToken)
        }
    }
}

#[async_trait::async_trait]
impl TokenCodec for JwtHs256Codec {
    async fn sign_access(&self, mut claims: AccessClaims) -> Result<SignedAccess, AuthError> {
        (claims.iat, claims.exp) = self.stamp(self.access_ttl_secs)?;
        let token = self.sign(&claims)?;
        Ok(SignedAccess {
            claims,
            token: AccessToken(token),
        })
    }

    async fn sign_refresh(&self, mut claims: RefreshClaims) -> Result<SignedRefresh, AuthError> {
        (claims.iat, claims.exp) = self.stamp(self.refresh_ttl_secs)?;
        claims.token_id = TokenId::generate();
        let token = self.sign(&claims)?;
        Ok(SignedRefresh {
            claims,
            token: RefreshToken(token),
        })
    }

    async fn verify_access(&self, token: &AccessToken) -> Result<AccessClaims, AuthError> {
        let claims: AccessClaims = self.decode_claims(&token.0)?;
        self.check_not_expired(claims.exp)?;
        Ok(claims)
    }

    async fn verify_refresh(&self, token: &RefreshToken) -> Result<RefreshClaims, AuthError> {
        let claims: RefreshClaims = self.decode_claims(&token.0)?;
        self.check_not_expired(claims.exp)?;
        Ok(claims)
    }
}
