use crate::{Cache, CoreError};
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::MultiplexedConnection};
use tracing::info;

/// Cache port on Redis, shared by every gateway instance.
///
/// All keys are stored under `key_prefix` so several deployments can share one
/// Redis database.
#[derive(Clone)]
pub struct RedisCache {
    connection: MultiplexedConnection,
    key_prefix: String,
    default_ttl_seconds: u64,
}

impl RedisCache {
    pub async fn connect(
        redis_url: &str,
        key_prefix: impl Into<String>,
        default_ttl_seconds: u64,
    ) -> Result<Self, CoreError> {
        let client = Client::open(redis_url)
            .map_err(|e| CoreError::Configuration(format!("Invalid Redis URL: {e}")))?;
        let connection = client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(|e| CoreError::Infrastructure(Box::new(e)))?;
        info!("Redis cache connected");
        Ok(Self {
            connection,
            key_prefix: key_prefix.into(),
            default_ttl_seconds,
        })
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CoreError> {
        let mut conn = self.connection.clone();
        conn.get(self.key(key))
            .await
            .map_err(|e| CoreError::Infrastructure(Box::new(e)))
    }

    async fn set(
        &self,
        key: &str,
        value: &[u8],
        ttl_seconds: Option<u64>,
    ) -> Result<(), CoreError> {
        let mut conn = self.connection.clone();
        // SETEX rejects 0
        let ttl = ttl_seconds.unwrap_or(self.default_ttl_seconds).max(1);
        conn.set_ex(self.key(key), value, ttl)
            .await
            .map_err(|e| CoreError::Infrastructure(Box::new(e)))
    }

    async fn delete(&self, key: &str) -> Result<(), CoreError> {
        let mut conn = self.connection.clone();
        conn.del(self.key(key))
            .await
            .map(|_: usize| ())
            .map_err(|e| CoreError::Infrastructure(Box::new(e)))
    }
}
