use async_trait::async_trait;
use log::{debug, warn};
use redis::Client as RedisClient;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// String-valued cache with expiry. Implementations swallow backend errors:
/// a failing cache behaves like an empty one.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get_raw(&self, key: &str) -> Option<String>;
    async fn set_raw(&self, key: &str, value: String, ttl: Duration);
    async fn delete(&self, key: &str);
}

/// Read and decode a JSON value; undecodable entries are dropped
pub async fn get_json<T: DeserializeOwned>(cache: &dyn Cache, key: &str) -> Option<T> {
    let raw = cache.get_raw(key).await?;
    match serde_json::from_str::<T>(&raw) {
        Ok(value) => {
            debug!("Cache hit for key: {}", key);
            Some(value)
        }
        Err(e) => {
            warn!("Failed to deserialize cached value for key {}: {}", key, e);
            cache.delete(key).await;
            None
        }
    }
}

pub async fn set_json<T: Serialize>(cache: &dyn Cache, key: &str, value: &T, ttl: Duration) {
    match serde_json::to_string(value) {
        Ok(serialized) => cache.set_raw(key, serialized, ttl).await,
        Err(e) => warn!("Failed to serialize value for key {}: {}", key, e),
    }
}

/// Key for a cached search, e.g. `search:city:ber:10`
pub fn search_key(kind: &str, term: &str, limit: usize) -> String {
    format!("search:{}:{}:{}", kind, term.trim().to_lowercase(), limit)
}

/// Redis-backed cache
#[derive(Clone)]
pub struct RedisCache {
    client: Arc<RedisClient>,
    key_prefix: String,
}

impl RedisCache {
    /// Create a new Redis cache with a key prefix (may be empty)
    pub fn new(client: RedisClient, key_prefix: String) -> Self {
        Self {
            client: Arc::new(client),
            key_prefix,
        }
    }

    /// Build the full cache key with prefix
    fn full_key(&self, key: &str) -> String {
        if self.key_prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", self.key_prefix, key)
        }
    }

    async fn connection(&self) -> Option<redis::aio::Connection> {
        match self.client.get_async_connection().await {
            Ok(conn) => Some(conn),
            Err(e) => {
                warn!("Failed to get Redis connection: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get_raw(&self, key: &str) -> Option<String> {
        let full_key = self.full_key(key);
        let mut conn = self.connection().await?;
        match redis::cmd("GET")
            .arg(&full_key)
            .query_async::<_, Option<String>>(&mut conn)
            .await
        {
            Ok(value) => {
                if value.is_none() {
                    debug!("Cache miss for key: {}", full_key);
                }
                value
            }
            Err(e) => {
                warn!("Redis GET error for key {}: {}", full_key, e);
                None
            }
        }
    }

    async fn set_raw(&self, key: &str, value: String, ttl: Duration) {
        let full_key = self.full_key(key);
        let Some(mut conn) = self.connection().await else {
            return;
        };
        let ttl_seconds = ttl.as_secs().max(1);
        match redis::cmd("SETEX")
            .arg(&full_key)
            .arg(ttl_seconds)
            .arg(value)
            .query_async::<_, ()>(&mut conn)
            .await
        {
            Ok(_) => debug!("Cached value for key: {} (TTL: {}s)", full_key, ttl_seconds),
            Err(e) => warn!("Redis SETEX error for key {}: {}", full_key, e),
        }
    }

    async fn delete(&self, key: &str) {
        let full_key = self.full_key(key);
        let Some(mut conn) = self.connection().await else {
            return;
        };
        if let Err(e) = redis::cmd("DEL")
            .arg(&full_key)
            .query_async::<_, ()>(&mut conn)
            .await
        {
            warn!("Redis DEL error for key {}: {}", full_key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MemoryCache;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Entry {
        name: String,
    }

    #[test]
    fn search_key_lowercases_and_trims() {
        assert_eq!(search_key("city", "  BERlin ", 10), "search:city:berlin:10");
    }

    #[test]
    fn full_key_uses_prefix() {
        let client = RedisClient::open("redis://127.0.0.1/").unwrap();
        let cache = RedisCache::new(client.clone(), "dance".to_string());
        assert_eq!(cache.full_key("search:city:a:1"), "dance:search:city:a:1");
        let bare = RedisCache::new(client, String::new());
        assert_eq!(bare.full_key("k"), "k");
    }

    #[tokio::test]
    async fn json_helpers_round_trip_through_cache() {
        let cache = MemoryCache::default();
        let entry = Entry { name: "Berlin".into() };
        set_json(&cache, "k", &entry, Duration::from_secs(60)).await;
        assert_eq!(get_json::<Entry>(&cache, "k").await, Some(entry));
    }

    #[tokio::test]
    async fn corrupt_entry_is_dropped() {
        let cache = MemoryCache::default();
        cache.set_raw("k", "not json".into(), Duration::from_secs(60)).await;
        assert_eq!(get_json::<Entry>(&cache, "k").await, None);
        assert_eq!(cache.get_raw("k").await, None);
    }

    #[tokio::test]
    async fn unreachable_redis_acts_as_empty_cache() {
        let client = RedisClient::open("redis://127.0.0.1:1/").unwrap();
        let cache = RedisCache::new(client, String::new());
        cache.set_raw("k", "v".into(), Duration::from_secs(5)).await;
        assert_eq!(cache.get_raw("k").await, None);
    }
}
