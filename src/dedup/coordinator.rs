//! Deduplication coordinator
//!
//! Wraps webhook processing in a claim/cache protocol. Exactly one
//! delivery of a (user, platform, text) triple runs the pipeline inside
//! the TTL window; the rest get the winner's reply from the cache.

use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;
use tracing::warn;

use crate::config::AppConfig;
use crate::errors::Result;

use super::cache::DedupCache;
use super::fingerprint;
use super::IN_FLIGHT_MARKER;

/// Coordinates duplicate webhook deliveries through Redis
pub struct DedupCoordinator {
    cache: Option<DedupCache>,
    wait: Duration,
}

impl DedupCoordinator {
    /// Build the coordinator from configuration. Disabled dedup or an
    /// unusable Redis URL degrade to pass-through processing.
    pub fn from_config(config: &AppConfig) -> Self {
        let cache = if config.dedup_enabled() {
            match DedupCache::from_config(config) {
                Ok(cache) => Some(cache),
                Err(e) => {
                    warn!("Dedup cache unavailable, processing without dedup: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Self {
            cache,
            wait: Duration::from_millis(config.dedup.wait_ms),
        }
    }

    /// Whether a dedup cache is actually attached
    pub fn is_active(&self) -> bool {
        self.cache.is_some()
    }

    /// Run `process` at most once per delivery fingerprint.
    ///
    /// The winner's reply is cached for the TTL window and handed back
    /// verbatim to duplicates. A duplicate that arrives while the winner
    /// is still in flight waits briefly for the cached reply, then
    /// processes on its own rather than dropping the message. Every
    /// cache failure degrades to plain processing.
    pub async fn run<T, F, Fut>(
        &self,
        user_id: &str,
        platform: &str,
        message: &str,
        process: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let Some(cache) = &self.cache else {
            return process().await;
        };

        let fp = fingerprint(user_id, platform, message);

        let claimed = match cache.try_claim(&fp).await {
            Ok(claimed) => claimed,
            Err(e) => {
                warn!("Dedup claim failed, processing without dedup: {}", e);
                return process().await;
            }
        };

        if claimed {
            self.run_as_winner(cache, &fp, process).await
        } else {
            self.run_as_duplicate(cache, &fp, user_id, platform, process)
                .await
        }
    }

    async fn run_as_winner<T, F, Fut>(&self, cache: &DedupCache, fp: &str, process: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match process().await {
            Ok(reply) => {
                match serde_json::to_string(&reply) {
                    Ok(json) => {
                        if let Err(e) = cache.store_reply(fp, &json).await {
                            warn!("Failed to cache webhook reply: {}", e);
                        }
                    }
                    Err(e) => warn!("Failed to serialize webhook reply for cache: {}", e),
                }
                Ok(reply)
            }
            Err(e) => {
                // Drop the claim so a gateway retry gets processed.
                if let Err(del_err) = cache.release(fp).await {
                    warn!("Failed to release dedup claim: {}", del_err);
                }
                Err(e)
            }
        }
    }

    async fn run_as_duplicate<T, F, Fut>(
        &self,
        cache: &DedupCache,
        fp: &str,
        user_id: &str,
        platform: &str,
        process: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match cache.get(fp).await {
            Ok(Some(value)) if value != IN_FLIGHT_MARKER => {
                if let Ok(reply) = serde_json::from_str(&value) {
                    info!(
                        "Duplicate delivery from {} on {} served from cache",
                        user_id, platform
                    );
                    return Ok(reply);
                }
                warn!("Cached webhook reply unreadable, reprocessing");
                process().await
            }
            Ok(Some(_)) => {
                // Winner still in flight: wait once, re-check once.
                tokio::time::sleep(self.wait).await;
                match cache.get(fp).await {
                    Ok(Some(value)) if value != IN_FLIGHT_MARKER => {
                        if let Ok(reply) = serde_json::from_str(&value) {
                            info!(
                                "Duplicate delivery from {} on {} served from cache after wait",
                                user_id, platform
                            );
                            return Ok(reply);
                        }
                        warn!("Cached webhook reply unreadable, reprocessing");
                        process().await
                    }
                    _ => {
                        info!(
                            "In-flight winner for {} on {} did not finish in time, processing anyway",
                            user_id, platform
                        );
                        process().await
                    }
                }
            }
            // Claim expired between SET and GET
            Ok(None) => process().await,
            Err(e) => {
                warn!("Dedup read failed, processing without dedup: {}", e);
                process().await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct TestReply {
        text: String,
    }

    fn reply(text: &str) -> TestReply {
        TestReply {
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_disabled_dedup_processes_directly() {
        let mut config = AppConfig::default();
        config.dedup.enabled = false;
        let coordinator = DedupCoordinator::from_config(&config);
        assert!(!coordinator.is_active());

        let result = coordinator
            .run("u1", "whatsapp", "halo", || async { Ok(reply("hi")) })
            .await
            .unwrap();
        assert_eq!(result, reply("hi"));
    }

    #[tokio::test]
    async fn test_unreachable_redis_fails_open() {
        let mut config = AppConfig::default();
        config.dedup.redis_url = "redis://127.0.0.1:9".to_string();
        let coordinator = DedupCoordinator::from_config(&config);
        // Opening the client is lazy, so the cache is attached
        assert!(coordinator.is_active());

        // The claim fails at connection time and the message still flows
        let result = coordinator
            .run("u1", "whatsapp", "halo", || async { Ok(reply("hi")) })
            .await
            .unwrap();
        assert_eq!(result, reply("hi"));
    }

    #[tokio::test]
    async fn test_processing_errors_pass_through() {
        let mut config = AppConfig::default();
        config.dedup.enabled = false;
        let coordinator = DedupCoordinator::from_config(&config);

        let result: Result<TestReply> = coordinator
            .run("u1", "whatsapp", "halo", || async {
                Err(crate::errors::ChatRagError::LlmError("down".to_string()))
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    #[ignore = "Requires a running Redis instance"]
    async fn test_duplicate_gets_cached_reply() {
        let config = AppConfig::default();
        let coordinator = DedupCoordinator::from_config(&config);
        let message = format!("dup-test-{}", chrono::Utc::now().timestamp_millis());

        let first = coordinator
            .run("dup-user", "test", &message, || async {
                Ok(reply("original"))
            })
            .await
            .unwrap();
        assert_eq!(first, reply("original"));

        // The duplicate closure must not run; a changed reply proves it
        let second = coordinator
            .run("dup-user", "test", &message, || async {
                Ok(reply("should not appear"))
            })
            .await
            .unwrap();
        assert_eq!(second, reply("original"));
    }
}
