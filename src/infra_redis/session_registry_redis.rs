use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use redis::aio::ConnectionManager;
use redis::{RedisWrite, Script, ToRedisArgs};

// KEYS[1] session hash, KEYS[2] user index
// ARGV user_id, ip, token, created_at, updated_at, expires_at, expire_at_ms, token_id
const ADD_LUA: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 1 then
  return 0
end
redis.call('HSET', KEYS[1], 'user_id', ARGV[1], 'ip', ARGV[2], 'token', ARGV[3],
  'created_at', ARGV[4], 'updated_at', ARGV[5], 'expires_at', ARGV[6])
redis.call('PEXPIREAT', KEYS[1], ARGV[7])
redis.call('SADD', KEYS[2], ARGV[8])
return 1
"#;

// KEYS[1] session hash, KEYS[2] user index
// ARGV user_id, ip, token, token_id
const CONSUME_LUA: &str = r#"
local v = redis.call('HMGET', KEYS[1], 'user_id', 'ip', 'token')
if v[1] == ARGV[1] and v[2] == ARGV[2] and v[3] == ARGV[3] then
  redis.call('DEL', KEYS[1])
  redis.call('SREM', KEYS[2], ARGV[4])
  return 1
end
return 0
"#;

// KEYS[1] session hash
// ARGV user index prefix, token_id
const DELETE_LUA: &str = r#"
local uid = redis.call('HGET', KEYS[1], 'user_id')
redis.call('DEL', KEYS[1])
if uid then
  redis.call('SREM', ARGV[1] .. uid, ARGV[2])
end
return 1
"#;

// KEYS[1] user index
// ARGV session key prefix
const DELETE_ALL_LUA: &str = r#"
local ids = redis.call('SMEMBERS', KEYS[1])
for _, id in ipairs(ids) do
  redis.call('DEL', ARGV[1] .. id)
end
redis.call('DEL', KEYS[1])
return #ids
"#;

// KEYS[1] user index
// ARGV session key prefix
const COUNT_LUA: &str = r#"
local ids = redis.call('SMEMBERS', KEYS[1])
local live = 0
for _, id in ipairs(ids) do
  if redis.call('EXISTS', ARGV[1] .. id) == 1 then
    live = live + 1
  else
    redis.call('SREM', KEYS[1], id)
  end
end
return live
"#;

impl ToRedisArgs for UserId {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        out.write_arg(self.to_string().as_bytes())
    }
}

impl ToRedisArgs for TokenId {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        out.write_arg(self.to_string().as_bytes())
    }
}

/// Session hash per refresh token plus a set of token ids per user. The
/// hash expires with the refresh token; stale set members are dropped when
/// the user's sessions are counted.
pub struct RedisSessionRegistry {
    conn: ConnectionManager,
    prefix: String,
    add_script: Script,
    consume_script: Script,
    delete_script: Script,
    delete_all_script: Script,
    count_script: Script,
}

impl RedisSessionRegistry {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        RedisSessionRegistry {
            conn,
            prefix: prefix.into(),
            add_script: Script::new(ADD_LUA),
            consume_script: Script::new(CONSUME_LUA),
            delete_script: Script::new(DELETE_LUA),
            delete_all_script: Script::new(DELETE_ALL_LUA),
            count_script: Script::new(COUNT_LUA),
        }
    }

    fn session_prefix(&self) -> String {
        format!("{}:session:", self.prefix)
    }

    fn user_prefix(&self) -> String {
        format!("{}:user_sessions:", self.prefix)
    }

    fn session_key(&self, token_id: TokenId) -> String {
        format!("{}{}", self.session_prefix(), token_id)
    }

    fn user_key(&self, user_id: UserId) -> String {
        format!("{}{}", self.user_prefix(), user_id)
    }
}

fn store_err(e: redis::RedisError) -> AuthError {
    AuthError::Store(e.to_string())
}

#[async_trait::async_trait]
impl SessionRegistry for RedisSessionRegistry {
    async fn add(&self, record: RefreshSessionRecord) -> Result<(), AuthError> {
        let mut conn = self.conn.clone();
        let inserted: i64 = self
            .add_script
            .key(self.session_key(record.token_id))
            .key(self.user_key(record.user_id))
            .arg(record.user_id)
            .arg(&record.ip)
            .arg(&record.token)
            .arg(record.created_at.to_rfc3339())
            .arg(record.updated_at.to_rfc3339())
            .arg(record.expires_at.to_rfc3339())
            .arg(record.expires_at.timestamp_millis())
            .arg(record.token_id)
            .invoke_async(&mut conn)
            .await
            .map_err(store_err)?;

        if inserted == 1 {
            Ok(())
        } else {
            Err(AuthError::Conflict(format!(
                "refresh token {} already recorded",
                record.token_id
            )))
        }
    }

    async fn exists(&self, binding: &SessionBinding<'_>) -> Result<bool, AuthError> {
        let mut conn = self.conn.clone();
        let fields: Vec<Option<String>> = redis::cmd("HMGET")
            .arg(self.session_key(binding.token_id))
            .arg("user_id")
            .arg("ip")
            .arg("token")
            .query_async(&mut conn)
            .await
            .map_err(store_err)?;

        let user_id = binding.user_id.to_string();
        Ok(matches!(
            fields.as_slice(),
            [Some(u), Some(ip), Some(token)]
                if *u == user_id && ip == binding.ip && token == binding.token
        ))
    }

    async fn consume(&self, binding: &SessionBinding<'_>) -> Result<bool, AuthError> {
        let mut conn = self.conn.clone();
        let removed: i64 = self
            .consume_script
            .key(self.session_key(binding.token_id))
            .key(self.user_key(binding.user_id))
            .arg(binding.user_id)
            .arg(binding.ip)
            .arg(binding.token)
            .arg(binding.token_id)
            .invoke_async(&mut conn)
            .await
            .map_err(store_err)?;

        Ok(removed == 1)
    }

    async fn delete(&self, token_id: TokenId) -> Result<(), AuthError> {
        let mut conn = self.conn.clone();
        let _: i64 = self
            .delete_script
            .key(self.session_key(token_id))
            .arg(self.user_prefix())
            .arg(token_id)
            .invoke_async(&mut conn)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn delete_all_for_user(&self, user_id: UserId) -> Result<(), AuthError> {
        let mut conn = self.conn.clone();
        let removed: i64 = self
            .delete_all_script
            .key(self.user_key(user_id))
            .arg(self.session_prefix())
            .invoke_async(&mut conn)
            .await
            .map_err(store_err)?;
        tracing::debug!(%user_id, removed, "redis sessions purged");
        Ok(())
    }

    async fn count_for_user(&self, user_id: UserId) -> Result<usize, AuthError> {
        let mut conn = self.conn.clone();
        let live: i64 = self
            .count_script
            .key(self.user_key(user_id))
            .arg(self.session_prefix())
            .invoke_async(&mut conn)
            .await
            .map_err(store_err)?;

        usize::try_from(live).map_err(|e| AuthError::Store(e.to_string()))
    }
}
