//! In-memory configuration cache.
//!
//! A plain name -> document map with no expiry; staleness is the caller's
//! responsibility. Entries are created by a caching `get`, overwritten by
//! `update`/`patch` responses when already present, and removed explicitly.

use std::collections::HashMap;

use serde_json::Value;

/// Hit/miss counters for the configuration cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64 * 100.0
        }
    }
}

/// Unexpiring map from configuration name to last-known document.
#[derive(Debug, Default)]
pub struct ConfigCache {
    entries: HashMap<String, Value>,
    hits: u64,
    misses: u64,
}

impl ConfigCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a cached document, counting the hit or miss.
    pub fn get(&mut self, name: &str) -> Option<Value> {
        match self.entries.get(name) {
            Some(value) => {
                self.hits += 1;
                tracing::debug!(config = %name, "cache hit");
                Some(value.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Store or overwrite an entry.
    pub fn insert(&mut self, name: &str, value: Value) {
        self.entries.insert(name.to_string(), value);
    }

    /// Overwrite an entry only if one already exists. Used after
    /// `update`/`patch`: a successful write refreshes a cached copy but never
    /// creates one.
    pub fn overwrite_if_present(&mut self, name: &str, value: Value) {
        if let Some(entry) = self.entries.get_mut(name) {
            *entry = value;
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Remove one entry (`Some(name)`) or all entries (`None`).
    pub fn clear(&mut self, name: Option<&str>) {
        match name {
            Some(name) => {
                self.entries.remove(name);
            }
            None => self.entries.clear(),
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_and_get() {
        let mut cache = ConfigCache::new();
        cache.insert("display", json!({"width": 800}));
        assert_eq!(cache.get("display"), Some(json!({"width": 800})));
    }

    #[test]
    fn test_miss_returns_none() {
        let mut cache = ConfigCache::new();
        assert_eq!(cache.get("absent"), None);
    }

    #[test]
    fn test_overwrite_if_present_skips_missing() {
        let mut cache = ConfigCache::new();
        cache.overwrite_if_present("display", json!({"width": 1024}));
        assert!(!cache.contains("display"));
    }

    #[test]
    fn test_overwrite_if_present_replaces_existing() {
        let mut cache = ConfigCache::new();
        cache.insert("display", json!({"width": 800}));
        cache.overwrite_if_present("display", json!({"width": 1024}));
        assert_eq!(cache.get("display"), Some(json!({"width": 1024})));
    }

    #[test]
    fn test_clear_single_entry() {
        let mut cache = ConfigCache::new();
        cache.insert("display", json!({}));
        cache.insert("network", json!({}));
        cache.clear(Some("display"));
        assert!(!cache.contains("display"));
        assert!(cache.contains("network"));
    }

    #[test]
    fn test_clear_all_entries() {
        let mut cache = ConfigCache::new();
        cache.insert("display", json!({}));
        cache.insert("network", json!({}));
        cache.clear(None);
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn test_stats_counting() {
        let mut cache = ConfigCache::new();
        cache.insert("display", json!({}));

        cache.get("display");
        cache.get("display");
        cache.get("missing");

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
        assert!((stats.hit_rate() - 66.666).abs() < 0.1);
    }

    #[test]
    fn test_hit_rate_empty() {
        let cache = ConfigCache::new();
        assert_eq!(cache.stats().hit_rate(), 0.0);
    }
}
