//! In-process fallback cache used when Redis is slow/unavailable, and as the
//! backing store for unit tests that don't want a live Redis.

use dashmap::DashMap;
use std::time::{Duration, Instant};

struct Entry {
    value: String,
    expires_at: Instant,
}

#[derive(Clone, Default)]
pub struct LocalFallback {
    entries: std::sync::Arc<DashMap<String, Entry>>,
}

impl LocalFallback {
    pub fn new() -> Self {
        Self {
            entries: std::sync::Arc::new(DashMap::new()),
        }
    }

    pub fn get<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entry = self.entries.get(key)?;
        if entry.expires_at < Instant::now() {
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        serde_json::from_str(&entry.value).ok()
    }

    pub fn set(&self, key: &str, raw_json: String, ttl_secs: u64) {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: raw_json,
                expires_at: Instant::now() + Duration::from_secs(ttl_secs.max(1)),
            },
        );
    }

    pub fn delete(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Deletes every key sharing `prefix`. Used both for namespaced pattern
    /// deletes and to approximate tag invalidation in the local fallback
    /// (Redis is the source of truth for tag membership; the local map just
    /// avoids serving something Redis has already forgotten).
    pub fn delete_prefix(&self, prefix: &str) {
        let dead: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.key().starts_with(prefix))
            .map(|e| e.key().clone())
            .collect();
        for key in dead {
            self.entries.remove(&key);
        }
    }
}
