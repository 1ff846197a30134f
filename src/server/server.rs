use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::{Settings, StorageBackend};
use anyhow::anyhow;
use sqlx::{MySql, Pool};
use std::sync::Arc;

/// Composition root: owns the service graph and the connection pools behind
/// it.
pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pool: Option<Pool<MySql>>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        settings.validate()?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let storage = &settings.storage;

        let mut pool = None;
        let (user_repo, session_registry): (Arc<dyn UserRepo>, Arc<dyn SessionRegistry>) =
            match storage.backend {
                StorageBackend::Memory => {
                    warn!("memory storage selected: sessions and users are lost on restart");
                    let users: Arc<dyn UserRepo> = Arc::new(MemoryUserRepo::new(clock.clone()));
                    let sessions: Arc<dyn SessionRegistry> =
                        Arc::new(MemorySessionRegistry::new(clock.clone()));
                    (users, sessions)
                }
                StorageBackend::Mysql => {
                    let mysql = connect_mysql(storage.mysql_dsn.as_deref()).await?;
                    pool = Some(mysql.clone());
                    let users: Arc<dyn UserRepo> =
                        Arc::new(MySqlUserRepo::new(mysql.clone(), clock.clone()));
                    let sessions: Arc<dyn SessionRegistry> =
                        Arc::new(MySqlSessionRegistry::new(mysql, clock.clone()));
                    (users, sessions)
                }
                StorageBackend::Redis => {
                    let mysql = connect_mysql(storage.mysql_dsn.as_deref()).await?;
                    pool = Some(mysql.clone());
                    let dsn = storage
                        .redis_dsn
                        .as_deref()
                        .ok_or_else(|| anyhow!("storage.redis_dsn is not set"))?;
                    let redis_client = redis::Client::open(dsn)?;
                    let redis_manager = redis_client.get_connection_manager().await?;
                    let users: Arc<dyn UserRepo> =
                        Arc::new(MySqlUserRepo::new(mysql, clock.clone()));
                    let sessions: Arc<dyn SessionRegistry> = Arc::new(RedisSessionRegistry::new(
                        redis_manager,
                        storage.key_prefix.clone(),
                    ));
                    (users, sessions)
                }
            };

        let auth_service = build_auth_service(settings, user_repo, session_registry, clock)?;

        info!(backend = ?storage.backend, "server started");

        Ok(Self { auth_service, pool })
    }

    /// Wraps an already-built service, e.g. one backed by test doubles.
    pub fn from_service(auth_service: Arc<dyn AuthService>) -> Self {
        Self {
            auth_service,
            pool: None,
        }
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}

async fn connect_mysql(dsn: Option<&str>) -> anyhow::Result<Pool<MySql>> {
    let dsn = dsn.ok_or_else(|| anyhow!("storage.mysql_dsn is not set"))?;
    let pool = Pool::<MySql>::connect(dsn).await?;
    Ok(pool)
}

/// Builds the [`SessionService`] with the production codec and hasher.
pub fn build_auth_service(
    settings: &Settings,
    user_repo: Arc<dyn UserRepo>,
    session_registry: Arc<dyn SessionRegistry>,
    clock: Arc<dyn Clock>,
) -> anyhow::Result<Arc<dyn AuthService>> {
    let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::try_new(
        settings.auth.jwt_config(),
        clock.clone(),
    )?);
    let credential_hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2PasswordHasher::default());

    let service = SessionService::try_new(
        user_repo,
        session_registry,
        token_codec,
        credential_hasher,
        clock,
        settings.auth.session_policy(),
    )?;
    Ok(Arc::new(service))
}
