//! Redis-backed delivery cache
//!
//! Thin wrapper over the redis crate: one multiplexed connection per
//! operation, keys namespaced under `dedup:`, every entry carrying the
//! configured TTL so abandoned claims expire on their own.

use tracing::debug;

use crate::config::AppConfig;
use crate::errors::ChatRagError;
use crate::errors::Result;

use super::IN_FLIGHT_MARKER;

/// Redis client for webhook deduplication
#[derive(Clone)]
pub struct DedupCache {
    client: redis::Client,
    ttl_secs: u64,
}

impl DedupCache {
    /// Create a cache handle from configuration. Opening the client does
    /// not touch the network; connection errors surface per operation.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = redis::Client::open(config.redis_url())
            .map_err(|e| ChatRagError::CacheError(format!("Invalid Redis URL: {e}")))?;

        Ok(Self {
            client,
            ttl_secs: config.dedup.ttl_secs,
        })
    }

    fn key(fingerprint: &str) -> String {
        format!("dedup:{fingerprint}")
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(|e| ChatRagError::CacheError(format!("Redis connection failed: {e}")))
    }

    /// Claim a fingerprint for processing. Returns true when this call
    /// won the claim, false when another delivery holds it already.
    pub async fn try_claim(&self, fingerprint: &str) -> Result<bool> {
        let key = Self::key(fingerprint);
        let mut conn = self.connection().await?;

        // SET NX EX: value only written when the key is absent, and the
        // claim expires on its own if the winner dies mid-processing.
        let claimed: bool = redis::cmd("SET")
            .arg(&key)
            .arg(IN_FLIGHT_MARKER)
            .arg("NX")
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async(&mut conn)
            .await
            .map_err(|e| ChatRagError::CacheError(format!("Redis SET NX failed: {e}")))?;

        debug!("Dedup claim for {}: {}", key, claimed);
        Ok(claimed)
    }

    /// Read the cached entry for a fingerprint. `None` means the claim
    /// expired or was never made; the in-flight marker means the winner
    /// is still processing.
    pub async fn get(&self, fingerprint: &str) -> Result<Option<String>> {
        let key = Self::key(fingerprint);
        let mut conn = self.connection().await?;

        redis::cmd("GET")
            .arg(&key)
            .query_async(&mut conn)
            .await
            .map_err(|e| ChatRagError::CacheError(format!("Redis GET failed: {e}")))
    }

    /// Overwrite the claim with the final serialized reply, refreshing
    /// the TTL so late duplicates still find it.
    pub async fn store_reply(&self, fingerprint: &str, reply_json: &str) -> Result<()> {
        let key = Self::key(fingerprint);
        let mut conn = self.connection().await?;

        redis::pipe()
            .set(&key, reply_json)
            .ignore()
            .expire(&key, self.ttl_secs as i64)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| ChatRagError::CacheError(format!("Redis SET failed: {e}")))?;

        debug!("Cached webhook reply under {}", key);
        Ok(())
    }

    /// Drop the claim so a retry of a failed delivery can be processed.
    pub async fn release(&self, fingerprint: &str) -> Result<()> {
        let key = Self::key(fingerprint);
        let mut conn = self.connection().await?;

        redis::cmd("DEL")
            .arg(&key)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| ChatRagError::CacheError(format!("Redis DEL failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_cache() -> DedupCache {
        let mut config = AppConfig::default();
        config.dedup.redis_url = "redis://127.0.0.1:9".to_string();
        DedupCache::from_config(&config).unwrap()
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let mut config = AppConfig::default();
        config.dedup.redis_url = "not a url".to_string();
        assert!(DedupCache::from_config(&config).is_err());
    }

    #[tokio::test]
    async fn test_operations_fail_cleanly_without_redis() {
        let cache = unreachable_cache();

        let err = cache.try_claim("aaaa").await.unwrap_err();
        assert!(matches!(err, ChatRagError::CacheError(_)));

        let err = cache.get("aaaa").await.unwrap_err();
        assert!(matches!(err, ChatRagError::CacheError(_)));
    }

    #[tokio::test]
    #[ignore = "Requires a running Redis instance"]
    async fn test_claim_store_get_cycle() {
        let config = AppConfig::default();
        let cache = DedupCache::from_config(&config).unwrap();
        let fp = super::super::fingerprint("test-user", "test", "cycle");

        cache.release(&fp).await.unwrap();

        assert!(cache.try_claim(&fp).await.unwrap());
        assert!(!cache.try_claim(&fp).await.unwrap());
        assert_eq!(
            cache.get(&fp).await.unwrap().as_deref(),
            Some(IN_FLIGHT_MARKER)
        );

        cache.store_reply(&fp, r#"{"ok":true}"#).await.unwrap();
        assert_eq!(
            cache.get(&fp).await.unwrap().as_deref(),
            Some(r#"{"ok":true}"#)
        );

        cache.release(&fp).await.unwrap();
        assert_eq!(cache.get(&fp).await.unwrap(), None);
    }
}
