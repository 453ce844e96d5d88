//! Unified cache-aside layer (C1).
//!
//! Backs onto Redis with an optional in-process fallback map so reads never
//! block on a cold/unavailable cache. Every operation is best-effort: a
//! backing-store error degrades a read to a miss and a write to a silent
//! no-op, logged at `warn!`, never surfaced to the caller as a failure — the
//! orchestrator must stay correct with the cache entirely down.
//!
//! Tag membership (`setWithTags` / `invalidateByTags`) is implemented with
//! Redis sets: `SADD {tag_key} {key}` records membership, and invalidation
//! unions the tag's members before deleting both the members and the tag set
//! itself. Keys are namespaced under a fixed prefix so `deletePattern` can
//! never reach outside this service's own keyspace.

mod local;

use redis::aio::ConnectionManager;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::metrics::CACHE_RESULT_TOTAL;
use local::LocalFallback;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub namespace: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            namespace: "feedcore".to_string(),
        }
    }
}

/// Cache layer (C1). Cheap to clone — the Redis connection manager and the
/// local fallback map are both internally shared.
#[derive(Clone)]
pub struct Cache {
    redis: Option<ConnectionManager>,
    local: LocalFallback,
    config: CacheConfig,
}

impl Cache {
    pub async fn connect(redis_url: &str, config: CacheConfig) -> Self {
        match redis::Client::open(redis_url) {
            Ok(client) => match ConnectionManager::new(client).await {
                Ok(manager) => {
                    return Self {
                        redis: Some(manager),
                        local: LocalFallback::new(),
                        config,
                    }
                }
                Err(e) => warn!("cache: failed to establish Redis connection manager: {e}"),
            },
            Err(e) => warn!("cache: failed to parse Redis URL: {e}"),
        }
        Self {
            redis: None,
            local: LocalFallback::new(),
            config,
        }
    }

    /// Construct with no Redis backing at all — every operation falls
    /// through to the in-process map. Used in tests.
    pub fn local_only(config: CacheConfig) -> Self {
        Self {
            redis: None,
            local: LocalFallback::new(),
            config,
        }
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:{}", self.config.namespace, key)
    }

    fn tag_key(&self, tag: &str) -> String {
        format!("{}:tag:{}", self.config.namespace, tag)
    }

    pub async fn ping(&self) -> bool {
        let Some(mut conn) = self.redis.clone() else {
            return false;
        };
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .is_ok()
    }

    /// Get a cached value, returning `None` on miss *or* on any backing
    /// error — the contract in the spec requires callers never distinguish
    /// "miss" from "cache unavailable".
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let full_key = self.namespaced(key);

        if let Some(mut conn) = self.redis.clone() {
            match redis::cmd("GET")
                .arg(&full_key)
                .query_async::<_, Option<String>>(&mut conn)
                .await
            {
                Ok(Some(raw)) => {
                    return match serde_json::from_str(&raw) {
                        Ok(value) => {
                            debug!("cache hit: {full_key}");
                            CACHE_RESULT_TOTAL.with_label_values(&["hit"]).inc();
                            Some(value)
                        }
                        Err(e) => {
                            warn!("cache: deserialization failed for {full_key}: {e}");
                            CACHE_RESULT_TOTAL.with_label_values(&["miss"]).inc();
                            None
                        }
                    };
                }
                Ok(None) => {
                    debug!("cache miss: {full_key}");
                    CACHE_RESULT_TOTAL.with_label_values(&["miss"]).inc();
                    return self.local.get(&full_key);
                }
                Err(e) => {
                    warn!("cache: GET failed for {full_key}, degrading to local fallback: {e}");
                }
            }
        }
        self.local.get(&full_key)
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) {
        self.set_with_tags(key, value, ttl_secs, &[]).await
    }

    pub async fn set_with_tags<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: u64,
        tags: &[String],
    ) {
        let full_key = self.namespaced(key);
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("cache: serialization failed for {full_key}: {e}");
                return;
            }
        };

        self.local.set(&full_key, raw.clone(), ttl_secs);

        if let Some(mut conn) = self.redis.clone() {
            if let Err(e) = redis::cmd("SETEX")
                .arg(&full_key)
                .arg(ttl_secs)
                .arg(&raw)
                .query_async::<_, ()>(&mut conn)
                .await
            {
                warn!("cache: SETEX failed for {full_key}: {e}");
                return;
            }

            for tag in tags {
                let tag_key = self.tag_key(tag);
                if let Err(e) = redis::cmd("SADD")
                    .arg(&tag_key)
                    .arg(&full_key)
                    .query_async::<_, ()>(&mut conn)
                    .await
                {
                    warn!("cache: SADD failed for tag {tag_key}: {e}");
                    continue;
                }
                let _ = redis::cmd("EXPIRE")
                    .arg(&tag_key)
                    .arg(ttl_secs + 60)
                    .query_async::<_, ()>(&mut conn)
                    .await;
            }
        }
    }

    pub async fn delete(&self, key: &str) {
        let full_key = self.namespaced(key);
        self.local.delete(&full_key);
        if let Some(mut conn) = self.redis.clone() {
            if let Err(e) = redis::cmd("DEL")
                .arg(&full_key)
                .query_async::<_, ()>(&mut conn)
                .await
            {
                warn!("cache: DEL failed for {full_key}: {e}");
            }
        }
    }

    /// Deletes keys matching a server-side pattern. Patterns are always
    /// prefixed with the cache namespace so a caller can never reach outside
    /// this service's own keyspace — the "string pattern deletion is a
    /// footgun" design note.
    pub async fn delete_pattern(&self, pattern: &str) {
        let full_pattern = self.namespaced(pattern);
        self.local.delete_prefix(&full_pattern.trim_end_matches('*'));

        let Some(mut conn) = self.redis.clone() else {
            return;
        };
        let keys: Vec<String> = match redis::cmd("KEYS")
            .arg(&full_pattern)
            .query_async(&mut conn)
            .await
        {
            Ok(keys) => keys,
            Err(e) => {
                warn!("cache: KEYS failed for pattern {full_pattern}: {e}");
                return;
            }
        };
        if keys.is_empty() {
            return;
        }
        if let Err(e) = redis::cmd("DEL")
            .arg(&keys)
            .query_async::<_, ()>(&mut conn)
            .await
        {
            warn!("cache: DEL failed for pattern {full_pattern}: {e}");
        }
    }

    /// Unions every tag's member set, deletes those keys, then deletes the
    /// tag sets themselves. After this call, every previously `set_with_tags`
    /// key carrying any of `tags` is a guaranteed miss.
    pub async fn invalidate_by_tags(&self, tags: &[String]) {
        for tag in tags {
            let tag_key = self.tag_key(tag);
            self.local.delete_prefix(&tag_key);

            let Some(mut conn) = self.redis.clone() else {
                continue;
            };
            let members: Vec<String> = match redis::cmd("SMEMBERS")
                .arg(&tag_key)
                .query_async(&mut conn)
                .await
            {
                Ok(members) => members,
                Err(e) => {
                    warn!("cache: SMEMBERS failed for {tag_key}: {e}");
                    continue;
                }
            };

            for key in &members {
                self.local.delete(key);
            }

            if !members.is_empty() {
                if let Err(e) = redis::cmd("DEL")
                    .arg(&members)
                    .query_async::<_, ()>(&mut conn)
                    .await
                {
                    warn!("cache: DEL failed while invalidating tag {tag_key}: {e}");
                }
            }
            let _ = redis::cmd("DEL")
                .arg(&tag_key)
                .query_async::<_, ()>(&mut conn)
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Payload {
        value: i32,
    }

    #[tokio::test]
    async fn local_only_roundtrip() {
        let cache = Cache::local_only(CacheConfig::default());
        cache.set("k1", &Payload { value: 42 }, 60).await;
        let got: Option<Payload> = cache.get("k1").await;
        assert_eq!(got, Some(Payload { value: 42 }));
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let cache = Cache::local_only(CacheConfig::default());
        cache.set("k2", &Payload { value: 1 }, 60).await;
        cache.delete("k2").await;
        let got: Option<Payload> = cache.get("k2").await;
        assert_eq!(got, None);
    }

    #[tokio::test]
    async fn missing_cache_is_not_an_error() {
        let cache = Cache::local_only(CacheConfig::default());
        let got: Option<Payload> = cache.get("never-set").await;
        assert_eq!(got, None);
    }
}
