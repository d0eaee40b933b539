use std::collections::HashMap;

use async_trait::async_trait;
use configs::RedisConfig;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use tracing::info;

use super::HashStore;
use crate::errors::ServiceError;

/// Redis-backed [`HashStore`] over a shared, auto-reconnecting connection.
///
/// Cloning is cheap; all clones multiplex the same connection.
#[derive(Clone)]
pub struct RedisHashStore {
    conn: ConnectionManager,
}

impl RedisHashStore {
    /// Connect using the retry and timeout settings from `cfg`.
    pub async fn connect(cfg: &RedisConfig) -> Result<Self, ServiceError> {
        let (host, port) = cfg
            .host_port()
            .map_err(|e| ServiceError::Validation(e.to_string()))?;
        let info = ConnectionInfo {
            addr: ConnectionAddr::Tcp(host, port),
            redis: RedisConnectionInfo {
                db: cfg.db,
                password: cfg.password.clone(),
                ..Default::default()
            },
        };
        let client = redis::Client::open(info)?;
        let manager_cfg = ConnectionManagerConfig::new()
            .set_number_of_retries(cfg.max_retries)
            .set_connection_timeout(cfg.connect_timeout())
            .set_response_timeout(cfg.response_timeout());

        info!(addr = %cfg.addr, db = cfg.db, "connecting to redis");
        let conn = ConnectionManager::new_with_config(client, manager_cfg).await?;
        Ok(Self { conn })
    }

    /// Build from an already configured client, e.g. one opened from a URL.
    pub async fn from_client(client: redis::Client) -> Result<Self, ServiceError> {
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<String, ServiceError> {
        let mut conn = self.conn.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong)
    }
}

#[async_trait]
impl HashStore for RedisHashStore {
    async fn set_field(&self, key: &str, field: &str, value: &str) -> Result<(), ServiceError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.hset(key, field, value).await?;
        Ok(())
    }

    async fn get_field(&self, key: &str, field: &str) -> Result<Option<String>, ServiceError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.hget(key, field).await?;
        Ok(value)
    }

    async fn get_all(&self, key: &str) -> Result<HashMap<String, String>, ServiceError> {
        let mut conn = self.conn.clone();
        let map: HashMap<String, String> = conn.hgetall(key).await?;
        Ok(map)
    }

    async fn field_exists(&self, key: &str, field: &str) -> Result<bool, ServiceError> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.hexists(key, field).await?;
        Ok(exists)
    }

    async fn delete_field(&self, key: &str, field: &str) -> Result<bool, ServiceError> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.hdel(key, field).await?;
        Ok(removed > 0)
    }

    async fn incr_field(&self, key: &str, field: &str, delta: i64) -> Result<i64, ServiceError> {
        let mut conn = self.conn.clone();
        let value: i64 = conn.hincr(key, field, delta).await?;
        Ok(value)
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, ServiceError> {
        let mut conn = self.conn.clone();
        let pattern = format!("{}*", escape_glob(prefix));
        let keys: Vec<String> = conn.keys(pattern).await?;
        Ok(keys)
    }
}

/// Escape Redis glob metacharacters so `s` matches literally.
pub fn escape_glob(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
