//! In-memory embedding cache to avoid re-encoding repeated queries

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, SystemTime};

/// Upper bound on cached vectors; the cache is cleared wholesale when full
const MAX_ENTRIES: usize = 10_000;

#[derive(Clone)]
struct CacheEntry {
    embedding: Vec<f32>,
    expires_at: SystemTime,
}

/// TTL cache of query embeddings keyed by model and text
pub struct EmbeddingCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl EmbeddingCache {
    /// Create new cache with default TTL of 1 hour
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(3600))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Get cached embedding if present and not expired
    pub fn get(&self, key: &str) -> Option<Vec<f32>> {
        let entries = self.entries.read().ok()?;
        let entry = entries.get(key)?;

        if SystemTime::now() < entry.expires_at {
            Some(entry.embedding.clone())
        } else {
            None
        }
    }

    pub fn insert(&self, key: String, embedding: Vec<f32>) {
        let expires_at = SystemTime::now() + self.ttl;
        if let Ok(mut entries) = self.entries.write() {
            if entries.len() >= MAX_ENTRIES {
                entries.clear();
            }
            entries.insert(
                key,
                CacheEntry {
                    embedding,
                    expires_at,
                },
            );
        }
    }

    /// Drop expired entries
    pub fn cleanup(&self) {
        if let Ok(mut entries) = self.entries.write() {
            let now = SystemTime::now();
            entries.retain(|_, entry| now < entry.expires_at);
        }
    }

    pub fn stats(&self) -> CacheStats {
        match self.entries.read() {
            Ok(entries) => {
                let now = SystemTime::now();
                let total = entries.len();
                let expired = entries.values().filter(|e| now >= e.expires_at).count();
                CacheStats {
                    total_entries: total,
                    expired_entries: expired,
                    active_entries: total - expired,
                }
            }
            Err(_) => CacheStats::default(),
        }
    }
}

impl Default for EmbeddingCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub active_entries: usize,
}

/// Generate cache key for an embedding request
pub fn embedding_cache_key(model: &str, text: &str) -> String {
    format!("embed:{}:{}", model, blake3::hash(text.as_bytes()).to_hex())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_roundtrip() {
        let cache = EmbeddingCache::new();
        cache.insert("k".to_string(), vec![0.1, 0.2]);
        assert_eq!(cache.get("k"), Some(vec![0.1, 0.2]));
        assert_eq!(cache.get("missing"), None);
    }

    #[test]
    fn test_cache_expiry_and_cleanup() {
        let cache = EmbeddingCache::with_ttl(Duration::from_millis(50));
        cache.insert("k".to_string(), vec![1.0]);
        std::thread::sleep(Duration::from_millis(80));
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.stats().expired_entries, 1);

        cache.cleanup();
        assert_eq!(cache.stats().total_entries, 0);
    }

    #[test]
    fn test_cache_key_depends_on_model_and_text() {
        let a = embedding_cache_key("m1", "fever");
        assert_eq!(a, embedding_cache_key("m1", "fever"));
        assert_ne!(a, embedding_cache_key("m2", "fever"));
        assert_ne!(a, embedding_cache_key("m1", "cough"));
    }
}
