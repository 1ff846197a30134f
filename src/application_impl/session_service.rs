use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use futures_util::future::try_join;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const MIN_PASSWORD_LEN: usize = 5;

#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    /// Sessions a user may hold once issuance settles.
    pub max_sessions: usize,
    /// Deadline for each user-store and registry call.
    pub operation_timeout: Option<Duration>,
}

impl SessionPolicy {
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.max_sessions == 0 {
            return Err(AuthError::Config("max_sessions must be at least 1".to_string()));
        }
        if self.operation_timeout.is_some_and(|t| t.is_zero()) {
            return Err(AuthError::Config(
                "operation timeout must be positive when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Sign-in, sign-up, rotation and revocation on top of a [`TokenCodec`] and a
/// [`SessionRegistry`]. The only place where session policy lives.
pub struct SessionService {
    user_repo: Arc<dyn UserRepo>,
    session_registry: Arc<dyn SessionRegistry>,
    token_codec: Arc<dyn TokenCodec>,
    credential_hasher: Arc<dyn CredentialHasher>,
    clock: Arc<dyn Clock>,
    policy: SessionPolicy,
}

impl SessionService {
    pub fn try_new(
        user_repo: Arc<dyn UserRepo>,
        session_registry: Arc<dyn SessionRegistry>,
        token_codec: Arc<dyn TokenCodec>,
        credential_hasher: Arc<dyn CredentialHasher>,
        clock: Arc<dyn Clock>,
        policy: SessionPolicy,
    ) -> Result<Self, AuthError> {
        policy.validate()?;
        Ok(Self {
            user_repo,
            session_registry,
            token_codec,
            credential_hasher,
            clock,
            policy,
        })
    }

    fn validate_sign_up(email: &str, password: &str, name: &str) -> Result<(), InputError> {
        let well_formed = email.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        });
        if !well_formed || email.chars().any(char::is_whitespace) {
            return Err(InputError::EmailInvalid);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(InputError::PasswordLength);
        }
        if name.trim().is_empty() {
            return Err(InputError::NameRequired);
        }
        Ok(())
    }

    /// Runs a port call under the configured deadline.
    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, AuthError>
    where
        F: Future<Output = Result<T, AuthError>>,
    {
        match self.policy.operation_timeout {
            None => fut.await,
            Some(limit) => tokio::time::timeout(limit, fut).await.unwrap_or_else(|_| {
                warn!(op, ?limit, "deadline exceeded");
                Err(AuthError::Store(format!("{op}: deadline exceeded")))
            }),
        }
    }

    /// Mints a pair, records the refresh token, then enforces the session cap.
    ///
    /// The cap is checked after the insert, so a breach purges every session
    /// of the user, the one just issued included. If anything fails after the
    /// insert, the new record is removed again before the error is returned.
    async fn issue_tokens(&self, user_id: UserId, ip: &str) -> Result<AuthTokens, AuthError> {
        let (access, refresh) = try_join(
            self.token_codec.sign_access(AccessClaims::new(user_id)),
            self.token_codec.sign_refresh(RefreshClaims::new(user_id)),
        )
        .await
        .map_err(|e| {
            error!(%user_id, error = %e, "token minting failed");
            AuthError::Authorization(e.to_string())
        })?;

        let token_id = refresh.claims.token_id;
        let now = self.clock.now();
        let record = RefreshSessionRecord {
            token_id,
            user_id,
            token: refresh.token.0.clone(),
            ip: ip.to_string(),
            created_at: now,
            updated_at: now,
            expires_at: refresh.claims.expires_at(),
        };
        match self.bounded("session add", self.session_registry.add(record)).await {
            Ok(()) => {}
            // the id is fresh, so a conflict means the record is someone else's
            Err(e @ AuthError::Conflict(_)) => {
                error!(%user_id, error = %e, "persisting refresh session failed");
                return Err(AuthError::Authorization(e.to_string()));
            }
            Err(e) => {
                error!(%user_id, error = %e, "persisting refresh session failed");
                // a timed-out insert may still have landed
                self.discard_session(user_id, token_id).await;
                return Err(AuthError::Authorization(e.to_string()));
            }
        }

        if let Err(e) = self.enforce_session_cap(user_id).await {
            self.discard_session(user_id, token_id).await;
            return Err(AuthError::Authorization(e.to_string()));
        }

        debug!(%user_id, %token_id, "issued token pair");
        Ok(AuthTokens {
            access_token_expires_at: access.claims.expires_at(),
            refresh_token_expires_at: refresh.claims.expires_at(),
            access_token: access.token,
            refresh_token: refresh.token,
        })
    }

    async fn enforce_session_cap(&self, user_id: UserId) -> Result<(), AuthError> {
        let sessions = self
            .bounded("session count", self.session_registry.count_for_user(user_id))
            .await
            .inspect_err(|e| error!(%user_id, error = %e, "counting sessions failed"))?;

        if sessions > self.policy.max_sessions {
            warn!(
                %user_id,
                sessions,
                max_sessions = self.policy.max_sessions,
                "session cap exceeded, revoking all sessions"
            );
            self.bounded(
                "session purge",
                self.session_registry.delete_all_for_user(user_id),
            )
            .await
            .inspect_err(|e| error!(%user_id, error = %e, "purging sessions failed"))?;
        }
        Ok(())
    }

    /// Best-effort removal of a record whose token never reached the caller.
    async fn discard_session(&self, user_id: UserId, token_id: TokenId) {
        match self
            .bounded("session discard", self.session_registry.delete(token_id))
            .await
        {
            Ok(()) => debug!(%user_id, %token_id, "discarded unissued session"),
            Err(e) => error!(%user_id, %token_id, error = %e, "discarding unissued session failed"),
        }
    }
}

#[async_trait::async_trait]
impl AuthService for SessionService {
    async fn sign_in(&self, request: SignInInput) -> Result<AuthTokens, AuthError> {
        let SignInInput {
            email,
            password,
            ip,
        } = request;

        let user = match self
            .bounded("user lookup", self.user_repo.find_by_email(&email))
            .await
        {
            Ok(user) => user,
            Err(AuthError::NotFound) => return Err(AuthError::InvalidCredentials),
            Err(e) => return Err(e),
        };

        let ok = self
            .credential_hasher
            .verify_password(&password, &user.password_hash)
            .await?;
        if !ok {
            info!(user_id = %user.id, "sign-in rejected");
            return Err(AuthError::InvalidCredentials);
        }

        self.issue_tokens(user.id, &ip).await
    }

    async fn sign_up(&self, request: SignUpInput) -> Result<AuthTokens, AuthError> {
        let SignUpInput {
            email,
            password,
            name,
            ip,
        } = request;

        Self::validate_sign_up(&email, &password, &name)?;

        match self
            .bounded("user lookup", self.user_repo.find_by_email(&email))
            .await
        {
            Ok(_) => return Err(AuthError::EmailInUse),
            Err(AuthError::NotFound) => {}
            Err(e) => return Err(e),
        }

        let password_hash = self.credential_hasher.hash_password(&password).await?;
        let user = User::new(email, name, password_hash, self.clock.now());

        match self.bounded("user add", self.user_repo.add(&user)).await {
            Ok(()) => {}
            // lost a race with a concurrent sign-up for the same email
            Err(AuthError::Conflict(_)) => return Err(AuthError::EmailInUse),
            Err(e) => return Err(e),
        }
        info!(user_id = %user.id, "user registered");

        self.issue_tokens(user.id, &ip).await
    }

    async fn refresh(&self, refresh_token: &str, ip: &str) -> Result<AuthTokens, AuthError> {
        let claims = self
            .token_codec
            .verify_refresh(&RefreshToken(refresh_token.to_string()))
            .await?;

        let binding = SessionBinding {
            token_id: claims.token_id,
            user_id: claims.user_id,
            ip,
            token: refresh_token,
        };
        let consumed = self
            .bounded("session consume", self.session_registry.consume(&binding))
            .await?;
        if !consumed {
            // Rotated away, revoked, purged, or presented from another address.
            info!(
                user_id = %claims.user_id,
                token_id = %claims.token_id,
                "refresh rejected: no matching session"
            );
            return Err(AuthError::InvalidToken);
        }

        let user = match self
            .bounded("user lookup", self.user_repo.find_by_id(claims.user_id))
            .await
        {
            Ok(user) => user,
            Err(AuthError::NotFound) => return Err(AuthError::InvalidToken),
            Err(e) => return Err(e),
        };

        self.issue_tokens(user.id, ip).await
    }

    async fn logout(&self, refresh_token: &str, ip: &str) -> Result<(), AuthError> {
        let claims = self
            .token_codec
            .verify_refresh(&RefreshToken(refresh_token.to_string()))
            .await?;

        let binding = SessionBinding {
            token_id: claims.token_id,
            user_id: claims.user_id,
            ip,
            token: refresh_token,
        };
        let revoked = self
            .bounded("session consume", self.session_registry.consume(&binding))
            .await?;
        info!(user_id = %claims.user_id, token_id = %claims.token_id, revoked, "logout");
        Ok(())
    }

    async fn logout_all(&self, user_id: UserId) -> Result<(), AuthError> {
        self.bounded(
            "session purge",
            self.session_registry.delete_all_for_user(user_id),
        )
        .await?;
        info!(%user_id, "all sessions revoked");
        Ok(())
    }

    async fn validate_access(&self, token: &str) -> Result<AccessClaims, AuthError> {
        self.token_codec
            .verify_access(&AccessToken(token.to_string()))
            .await
    }

    async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.bounded("user lookup", self.user_repo.find_by_id(user_id))
            .await
    }

    async fn update_settings(&self, request: UpdateSettingsInput) -> Result<User, AuthError> {
        let currency = request
            .currency
            .parse::<Currency>()
            .map_err(|_| InputError::CurrencyInvalid)?;

        self.bounded("user lookup", self.user_repo.find_by_id(request.user_id))
            .await?;

        self.bounded(
            "user update",
            self.user_repo
                .update_settings(request.user_id, UserSettings { currency }),
        )
        .await
    }
}
