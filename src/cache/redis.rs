//! Redis-backed cache node.

use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use tracing::info;

use super::store::{CacheError, CacheStore};

pub struct RedisCacheStore {
    connection: ConnectionManager,
    prefix: String,
}

impl RedisCacheStore {
    /// Opens a managed connection that reconnects on its own after failures.
    pub async fn connect(url: &str, prefix: &str) -> Result<Self, CacheError> {
        let client = Client::open(url).map_err(CacheError::backend)?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(CacheError::backend)?;

        info!(
            target: "tasklane::cache",
            prefix,
            "Connected to Redis cache node"
        );

        Ok(Self {
            connection,
            prefix: prefix.to_string(),
        })
    }

    fn prefixed(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection.clone();
        conn.get::<_, Option<String>>(self.prefixed(key))
            .await
            .map_err(CacheError::backend)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        // SET EX rejects zero, so sub-second TTLs round up to one second.
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(self.prefixed(key), value, seconds)
            .await
            .map_err(CacheError::backend)
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        conn.del::<_, ()>(self.prefixed(key))
            .await
            .map_err(CacheError::backend)
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.connection.clone();
        conn.exists::<_, bool>(self.prefixed(key))
            .await
            .map_err(CacheError::backend)
    }
}
