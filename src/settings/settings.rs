use crate::application_impl::{JwtConfig, SessionPolicy, ttl_secs};
use crate::application_port::AuthError;
use anyhow::{Result, anyhow};
use chrono::Utc;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

pub const ENV_PREFIX: &str = "WALLET_USERS";

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub auth: Auth,
    pub storage: Storage,
    pub http: Http,
    pub log: Log,
}

#[derive(Clone, Deserialize)]
pub struct Auth {
    pub secret: String,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
    pub max_sessions: usize,
    #[serde(default)]
    pub operation_timeout_ms: Option<u64>,
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth")
            .field("secret", &"[REDACTED]")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .field("max_sessions", &self.max_sessions)
            .field("operation_timeout_ms", &self.operation_timeout_ms)
            .finish()
    }
}

impl Auth {
    /// Startup check of everything the token core needs.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.secret.trim().is_empty() {
            return Err(AuthError::Config("auth.secret must not be empty".to_string()));
        }
        let cfg = self.jwt_config();
        let now = Utc::now();
        ttl_secs("auth.access_ttl_secs", cfg.access_ttl, now)?;
        ttl_secs("auth.refresh_ttl_secs", cfg.refresh_ttl, now)?;
        self.session_policy().validate()
    }

    pub fn jwt_config(&self) -> JwtConfig {
        JwtConfig {
            secret: self.secret.clone().into_bytes(),
            access_ttl: Duration::from_secs(self.access_ttl_secs),
            refresh_ttl: Duration::from_secs(self.refresh_ttl_secs),
        }
    }

    pub fn session_policy(&self) -> SessionPolicy {
        SessionPolicy {
            max_sessions: self.max_sessions,
            operation_timeout: self.operation_timeout_ms.map(Duration::from_millis),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Mysql,
    /// Sessions in redis, users in mysql.
    Redis,
}

#[derive(Clone, Deserialize)]
pub struct Storage {
    pub backend: StorageBackend,
    #[serde(default)]
    pub mysql_dsn: Option<String>,
    #[serde(default)]
    pub redis_dsn: Option<String>,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

fn default_key_prefix() -> String {
    "wallet-users".to_string()
}

impl fmt::Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // DSNs may embed credentials
        f.debug_struct("Storage")
            .field("backend", &self.backend)
            .field("mysql_dsn", &self.mysql_dsn.as_ref().map(|_| "[REDACTED]"))
            .field("redis_dsn", &self.redis_dsn.as_ref().map(|_| "[REDACTED]"))
            .field("key_prefix", &self.key_prefix)
            .finish()
    }
}

impl Storage {
    pub fn validate(&self) -> Result<(), AuthError> {
        let needs_mysql = matches!(self.backend, StorageBackend::Mysql | StorageBackend::Redis);
        if needs_mysql && self.mysql_dsn.is_none() {
            return Err(AuthError::Config(
                "storage.mysql_dsn is required for this backend".to_string(),
            ));
        }
        if self.backend == StorageBackend::Redis && self.redis_dsn.is_none() {
            return Err(AuthError::Config(
                "storage.redis_dsn is required for the redis backend".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
    #[serde(default)]
    pub cert_path: Option<String>,
    #[serde(default)]
    pub key_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

/// Loads the settings file, then `WALLET_USERS__SECTION__KEY` overrides,
/// then validates.
pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    settings.validate()?;
    Ok(settings)
}

impl Settings {
    pub fn validate(&self) -> Result<(), AuthError> {
        self.auth.validate()?;
        self.storage.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> Auth {
        Auth {
            secret: "s3cret".to_string(),
            access_ttl_secs: 900,
            refresh_ttl_secs: 86400,
            max_sessions: 5,
            operation_timeout_ms: Some(2000),
        }
    }

    #[test]
    fn valid_auth_settings_pass() {
        assert!(auth().validate().is_ok());
        let policy = auth().session_policy();
        assert_eq!(policy.max_sessions, 5);
        assert_eq!(policy.operation_timeout, Some(Duration::from_secs(2)));
    }

    #[test]
    fn each_required_auth_value_is_checked() {
        let cases = [
            Auth {
                secret: "  ".to_string(),
                ..auth()
            },
            Auth {
                access_ttl_secs: 0,
                ..auth()
            },
            Auth {
                refresh_ttl_secs: 0,
                ..auth()
            },
            Auth {
                max_sessions: 0,
                ..auth()
            },
            Auth {
                access_ttl_secs: u64::MAX,
                ..auth()
            },
            Auth {
                refresh_ttl_secs: i64::MAX as u64,
                ..auth()
            },
        ];
        for case in cases {
            assert!(matches!(case.validate(), Err(AuthError::Config(_))), "{case:?}");
        }
    }

    #[test]
    fn secret_is_redacted() {
        let rendered = format!("{:?}", auth());
        assert!(!rendered.contains("s3cret"));
    }

    #[test]
    fn redis_backend_needs_both_dsns() {
        let storage = Storage {
            backend: StorageBackend::Redis,
            mysql_dsn: Some("mysql://localhost/users".to_string()),
            redis_dsn: None,
            key_prefix: default_key_prefix(),
        };
        assert!(storage.validate().is_err());

        let memory = Storage {
            backend: StorageBackend::Memory,
            mysql_dsn: None,
            redis_dsn: None,
            key_prefix: default_key_prefix(),
        };
        assert!(memory.validate().is_ok());
    }
}
