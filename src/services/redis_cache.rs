use async_trait::async_trait;
use redis::{aio::ConnectionManager, RedisResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::cache::CacheProvider;
use crate::error::{AppError, Result};

/// Prefix applied to every key written by this provider.
const KEY_PREFIX: &str = "stockcast:";

/// Redis-backed [`CacheProvider`].
///
/// When Redis is unreachable at start-up every lookup misses and every write
/// is dropped, so callers always fall through to the upstream source.
#[derive(Clone)]
pub struct RedisCacheProvider {
    conn: Arc<RwLock<Option<ConnectionManager>>>,
}

impl RedisCacheProvider {
    /// Create a provider, connecting to Redis at the given URL.
    pub async fn new(redis_url: &str) -> Self {
        let conn = match Self::connect(redis_url).await {
            Ok(c) => {
                info!("Connected to Redis at {}", redis_url);
                Some(c)
            }
            Err(e) => {
                warn!("Failed to connect to Redis: {}. Running without cache.", e);
                None
            }
        };

        Self {
            conn: Arc::new(RwLock::new(conn)),
        }
    }

    /// A provider that never connects.
    pub fn disconnected() -> Self {
        Self {
            conn: Arc::new(RwLock::new(None)),
        }
    }

    async fn connect(redis_url: &str) -> RedisResult<ConnectionManager> {
        let client = redis::Client::open(redis_url)?;
        ConnectionManager::new(client).await
    }

    pub async fn is_connected(&self) -> bool {
        self.conn.read().await.is_some()
    }

    fn key(key: &str) -> String {
        format!("{}{}", KEY_PREFIX, key)
    }
}

fn cache_error(e: redis::RedisError) -> AppError {
    AppError::Cache(e.to_string())
}

#[async_trait]
impl CacheProvider for RedisCacheProvider {
    async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let conn_guard = self.conn.read().await;
        let Some(ref conn) = *conn_guard else {
            return Ok(None);
        };
        let mut conn = conn.clone();
        drop(conn_guard);

        let value: Option<String> = redis::cmd("GET")
            .arg(Self::key(key))
            .query_async(&mut conn)
            .await
            .map_err(cache_error)?;
        if value.is_none() {
            debug!("Redis miss for {}", key);
        }
        Ok(value)
    }

    async fn set_raw(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let conn_guard = self.conn.read().await;
        let Some(ref conn) = *conn_guard else {
            return Ok(());
        };
        let mut conn = conn.clone();
        drop(conn_guard);

        let mut cmd = redis::cmd("SET");
        cmd.arg(Self::key(key)).arg(value);
        // EX requires a positive number of seconds
        let secs = ttl.as_secs();
        if secs > 0 {
            cmd.arg("EX").arg(secs);
        } else if !ttl.is_zero() {
            cmd.arg("PX").arg(ttl.as_millis().max(1) as u64);
        }
        cmd.query_async::<_, ()>(&mut conn)
            .await
            .map_err(cache_error)?;
        Ok(())
    }
}
