use redis::{AsyncCommands, RedisResult};
use tracing::debug;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    // ------------------------------------------------------------------
    // Response cache
    // ------------------------------------------------------------------

    pub async fn cache_get(&self, key: &str) -> RedisResult<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.get(key).await
    }

    pub async fn cache_put(&self, key: &str, body: &str, ttl_seconds: u64) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set_ex::<_, _, ()>(key, body, ttl_seconds).await?;
        Ok(())
    }

    /// Delete every key matching `pattern`. SCAN keeps this safe on a shared
    /// Redis; the key space for cached views is small.
    pub async fn invalidate_pattern(&self, pattern: &str) -> RedisResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let mut cursor: u64 = 0;
        let mut deleted: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                deleted += conn.del::<_, u64>(&keys).await?;
            }

            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        debug!("Cache invalidation: {} -> {} keys", pattern, deleted);
        Ok(deleted)
    }

    // ------------------------------------------------------------------
    // Token revocation
    // ------------------------------------------------------------------

    pub async fn deny_token(&self, jti: &str, ttl_seconds: u64) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("denylist:{}", jti);
        conn.set_ex::<_, _, ()>(key, 1, ttl_seconds.max(1)).await?;
        Ok(())
    }

    pub async fn is_token_denied(&self, jti: &str) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("denylist:{}", jti);
        conn.exists(key).await
    }

    // ------------------------------------------------------------------
    // Rate limiting
    // ------------------------------------------------------------------

    pub async fn check_rate_limit(
        &self,
        key: &str,
        limit: i64,
        window_seconds: i64,
    ) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let (count,): (i64,) = redis::pipe()
            .atomic()
            .incr(key, 1)
            .expire(key, window_seconds)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(count <= limit)
    }
}
