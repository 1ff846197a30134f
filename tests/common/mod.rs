#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wallet_users::application_impl::*;
use wallet_users::application_port::*;
use wallet_users::domain_model::*;
use wallet_users::domain_port::*;
use wallet_users::infra_memory::*;

pub const IP: &str = "203.0.113.10";
pub const PASSWORD: &str = "correct-horse";

pub const ACCESS_TTL_SECS: u64 = 15 * 60;
pub const REFRESH_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Reversible stand-in for argon2 so the suite stays fast.
pub struct PlainHasher;

#[async_trait::async_trait]
impl CredentialHasher for PlainHasher {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        Ok(format!("plain:{password}"))
    }

    async fn verify_password(
        &self,
        password: &str,
        password_hash: &str,
    ) -> Result<bool, AuthError> {
        Ok(password_hash.strip_prefix("plain:") == Some(password))
    }
}

pub const OPERATION_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Add,
    Count,
    Purge,
    Consume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Fail(Step),
    /// Never completes on its own; only a deadline ends it.
    Stall(Step),
}

/// Memory registry with one injectable fault.
pub struct FaultyRegistry {
    inner: Arc<MemorySessionRegistry>,
    fault: Mutex<Option<Fault>>,
}

impl FaultyRegistry {
    pub fn inject(&self, fault: Fault) {
        *self.fault.lock().unwrap() = Some(fault);
    }

    pub fn heal(&self) {
        *self.fault.lock().unwrap() = None;
    }

    async fn check(&self, step: Step) -> Result<(), AuthError> {
        let fault = *self.fault.lock().unwrap();
        match fault {
            Some(Fault::Fail(s)) if s == step => {
                Err(AuthError::Store(format!("{step:?} unavailable")))
            }
            Some(Fault::Stall(s)) if s == step => {
                std::future::pending::<()>().await;
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl SessionRegistry for FaultyRegistry {
    async fn add(&self, record: RefreshSessionRecord) -> Result<(), AuthError> {
        self.check(Step::Add).await?;
        self.inner.add(record).await
    }

    async fn exists(&self, binding: &SessionBinding<'_>) -> Result<bool, AuthError> {
        self.inner.exists(binding).await
    }

    async fn consume(&self, binding: &SessionBinding<'_>) -> Result<bool, AuthError> {
        self.check(Step::Consume).await?;
        self.inner.consume(binding).await
    }

    async fn delete(&self, token_id: TokenId) -> Result<(), AuthError> {
        self.inner.delete(token_id).await
    }

    async fn delete_all_for_user(&self, user_id: UserId) -> Result<(), AuthError> {
        self.check(Step::Purge).await?;
        self.inner.delete_all_for_user(user_id).await
    }

    async fn count_for_user(&self, user_id: UserId) -> Result<usize, AuthError> {
        self.check(Step::Count).await?;
        self.inner.count_for_user(user_id).await
    }
}

/// Real codec that can be told to stop minting refresh tokens.
pub struct FlakyCodec {
    inner: JwtHs256Codec,
    refuse_refresh: Mutex<bool>,
}

impl FlakyCodec {
    pub fn refuse_refresh(&self, refuse: bool) {
        *self.refuse_refresh.lock().unwrap() = refuse;
    }
}

#[async_trait::async_trait]
impl TokenCodec for FlakyCodec {
    async fn sign_access(&self, claims: AccessClaims) -> Result<SignedAccess, AuthError> {
        self.inner.sign_access(claims).await
    }

    async fn sign_refresh(&self, claims: RefreshClaims) -> Result<SignedRefresh, AuthError> {
        if *self.refuse_refresh.lock().unwrap() {
            return Err(AuthError::Internal("signer offline".to_string()));
        }
        self.inner.sign_refresh(claims).await
    }

    async fn verify_access(&self, token: &AccessToken) -> Result<AccessClaims, AuthError> {
        self.inner.verify_access(token).await
    }

    async fn verify_refresh(&self, token: &RefreshToken) -> Result<RefreshClaims, AuthError> {
        self.inner.verify_refresh(token).await
    }
}

pub struct Harness {
    pub service: Arc<SessionService>,
    pub sessions: Arc<MemorySessionRegistry>,
    pub faults: Arc<FaultyRegistry>,
    pub codec: Arc<FlakyCodec>,
    pub users: Arc<MemoryUserRepo>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn new(max_sessions: usize) -> Self {
        Self::with_hasher(max_sessions, Arc::new(PlainHasher))
    }

    pub fn with_hasher(max_sessions: usize, hasher: Arc<dyn CredentialHasher>) -> Self {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
        ));
        let users = Arc::new(MemoryUserRepo::new(clock.clone()));
        let sessions = Arc::new(MemorySessionRegistry::new(clock.clone()));
        let faults = Arc::new(FaultyRegistry {
            inner: sessions.clone(),
            fault: Mutex::new(None),
        });
        let jwt = JwtHs256Codec::try_new(
            JwtConfig {
                secret: b"integration-test-secret".to_vec(),
                access_ttl: Duration::from_secs(ACCESS_TTL_SECS),
                refresh_ttl: Duration::from_secs(REFRESH_TTL_SECS),
            },
            clock.clone(),
        )
        .unwrap();
        let codec = Arc::new(FlakyCodec {
            inner: jwt,
            refuse_refresh: Mutex::new(false),
        });
        let service = SessionService::try_new(
            users.clone(),
            faults.clone(),
            codec.clone(),
            hasher,
            clock.clone(),
            SessionPolicy {
                max_sessions,
                operation_timeout: Some(OPERATION_TIMEOUT),
            },
        )
        .unwrap();

        Harness {
            service: Arc::new(service),
            sessions,
            faults,
            codec,
            users,
            clock,
        }
    }

    pub async fn sign_up(&self, email: &str) -> AuthTokens {
        self.service
            .sign_up(SignUpInput {
                email: email.to_string(),
                password: PASSWORD.to_string(),
                name: "Ann".to_string(),
                ip: IP.to_string(),
            })
            .await
            .unwrap()
    }

    pub async fn sign_in(&self, email: &str) -> Result<AuthTokens, AuthError> {
        self.service
            .sign_in(SignInInput {
                email: email.to_string(),
                password: PASSWORD.to_string(),
                ip: IP.to_string(),
            })
            .await
    }
}
