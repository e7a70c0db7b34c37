//! Read-view cache service
//!
//! Redis-backed caching for UI-facing read views. The workflow emits an
//! invalidation effect after every committed mutation so read views never
//! serve a stale attendee list or count past one request lifetime.

use redis::{AsyncCommands, Client};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::RedisConfig;
use crate::utils::errors::{GatherHubError, Result};

/// Redis cache service for event read views
#[derive(Debug, Clone)]
pub struct CacheService {
    client: Client,
    config: RedisConfig,
}

impl CacheService {
    /// Create a new CacheService instance
    pub fn new(config: RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str()).map_err(GatherHubError::Redis)?;
        Ok(Self { client, config })
    }

    async fn get_connection(&self) -> Result<redis::aio::Connection> {
        self.client
            .get_async_connection()
            .await
            .map_err(GatherHubError::Redis)
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.config.prefix, key)
    }

    /// Set a value in the cache with TTL
    pub async fn set<T>(&self, key: &str, value: &T, ttl_seconds: Option<u64>) -> Result<()>
    where
        T: Serialize,
    {
        let mut conn = self.get_connection().await?;
        let serialized = serde_json::to_string(value).map_err(GatherHubError::Serialization)?;

        let full_key = self.full_key(key);
        let ttl = ttl_seconds.unwrap_or(self.config.ttl_seconds);

        let _: () = conn
            .set_ex(&full_key, serialized, ttl)
            .await
            .map_err(GatherHubError::Redis)?;

        debug!(key = %full_key, ttl = ttl, "Value set in cache");
        Ok(())
    }

    /// Get a value from the cache
    pub async fn get<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        let mut conn = self.get_connection().await?;
        let full_key = self.full_key(key);

        let result: Option<String> = conn.get(&full_key).await.map_err(GatherHubError::Redis)?;

        match result {
            Some(data) => {
                let deserialized =
                    serde_json::from_str::<T>(&data).map_err(GatherHubError::Serialization)?;
                Ok(Some(deserialized))
            }
            None => Ok(None),
        }
    }

    /// Delete a key from the cache
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.get_connection().await?;
        let full_key = self.full_key(key);

        let deleted: i32 = conn.del(&full_key).await.map_err(GatherHubError::Redis)?;

        debug!(key = %full_key, deleted = deleted > 0, "Key deletion attempted");
        Ok(deleted > 0)
    }

    /// Drop the cached read views for an event after a committed mutation.
    pub async fn invalidate_event(&self, event_id: i64) -> Result<()> {
        self.delete(&format!("event:{}:summary", event_id)).await?;
        self.delete(&format!("event:{}:attendees", event_id)).await?;

        debug!(event_id = event_id, "Event read views invalidated");
        Ok(())
    }

    /// Check cache health
    pub async fn health_check(&self) -> Result<bool> {
        let mut conn = self.get_connection().await?;
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(GatherHubError::Redis)?;
        Ok(pong == "PONG")
    }
}
