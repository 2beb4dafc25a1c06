// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::time::Duration;

use dashmap::DashMap;

use crate::tree::Value;

use super::entry::CacheEntry;

/// In-memory cache tier. Backed by `DashMap`, which shards its
/// internal storage across lock stripes itself — we don't need to
/// hand-roll shard routing on top of it the way the tree store does,
/// since DashMap's entry API already gives us fine-grained locking per
/// key.
pub struct ShardedL1Cache {
    entries: DashMap<String, CacheEntry>,
    max_entries: usize,
}

impl ShardedL1Cache {
    pub fn new(max_entries: usize) -> Self {
        ShardedL1Cache {
            entries: DashMap::new(),
            max_entries,
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let mut entry = self.entries.get_mut(key)?;
        if entry.is_expired() {
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        entry.touch();
        Some(entry.value.clone())
    }

    pub fn put(&self, key: String, value: Value, ttl: Duration) {
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&key) {
            self.evict_one();
        }
        self.entries.insert(key, CacheEntry::new(value, ttl));
    }

    pub fn remove(&self, key: &str) -> Option<CacheEntry> {
        self.entries.remove(key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evicts the entry with the lowest hit-count/recency-weighted
    /// score, scanning a snapshot of the current entries.
    fn evict_one(&self) {
        let victim = self
            .entries
            .iter()
            .min_by(|a, b| a.value().eviction_score().partial_cmp(&b.value().eviction_score()).unwrap())
            .map(|r| r.key().clone());
        if let Some(key) = victim {
            self.entries.remove(&key);
        }
    }

    pub fn iter_snapshot(&self) -> Vec<(String, CacheEntry)> {
        self.entries.iter().map(|r| (r.key().clone(), r.value().clone())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let cache = ShardedL1Cache::new(8);
        cache.put("ex:1".to_string(), Value::Int(42), Duration::from_secs(60));
        assert_eq!(cache.get("ex:1"), Some(Value::Int(42)));
    }

    #[test]
    fn expired_entry_is_evicted_on_get() {
        let cache = ShardedL1Cache::new(8);
        cache.put("ex:1".to_string(), Value::Int(1), Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get("ex:1"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn over_capacity_evicts_one_entry() {
        let cache = ShardedL1Cache::new(2);
        cache.put("a".to_string(), Value::Int(1), Duration::ZERO);
        cache.put("b".to_string(), Value::Int(2), Duration::ZERO);
        cache.put("c".to_string(), Value::Int(3), Duration::ZERO);
        assert_eq!(cache.len(), 2);
    }
}
