// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::value::Value;

const FNV_OFFSET: u64 = 14695981039346656037;
const FNV_PRIME: u64 = 1099511628211;

/// FNV-1a over a top-level key, used to pick the shard that owns it.
/// Every key permanently belongs to one shard, so sibling top-level
/// keys in different shards never contend for the same lock.
fn fnv1a_hash(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Physically partitions the document's top-level keys across a fixed
/// number of independently-locked maps. A path's first segment decides
/// its shard; everything beneath that segment is owned exclusively by
/// whichever thread holds that shard's write lock.
pub struct ShardedLockManager {
    shards: Vec<RwLock<HashMap<String, Value>>>,
}

impl ShardedLockManager {
    pub fn new(shard_count: usize) -> Self {
        let shard_count = shard_count.max(1);
        ShardedLockManager {
            shards: (0..shard_count).map(|_| RwLock::new(HashMap::new())).collect(),
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn shard_index(&self, top_level_key: &str) -> usize {
        (fnv1a_hash(top_level_key.as_bytes()) as usize) % self.shards.len()
    }

    pub fn read_shard(&self, top_level_key: &str) -> RwLockReadGuard<'_, HashMap<String, Value>> {
        self.shards[self.shard_index(top_level_key)].read()
    }

    pub fn write_shard(&self, top_level_key: &str) -> RwLockWriteGuard<'_, HashMap<String, Value>> {
        self.shards[self.shard_index(top_level_key)].write()
    }

    /// Acquire shard `index` directly, for callers (transaction commit)
    /// that already resolved the index and want to avoid re-hashing.
    pub fn write_shard_by_index(&self, index: usize) -> RwLockWriteGuard<'_, HashMap<String, Value>> {
        self.shards[index].write()
    }

    /// As `write_shard_by_index`, but gives up after `timeout` instead of
    /// blocking forever — spec §4.2's `TryLock(path, exclusive, timeout)`.
    pub fn try_write_shard_by_index(
        &self,
        index: usize,
        timeout: Duration,
    ) -> Option<RwLockWriteGuard<'_, HashMap<String, Value>>> {
        self.shards[index].try_write_for(timeout)
    }

    /// Acquire every shard for a full-document read (snapshot, `root()`).
    pub fn read_all(&self) -> Vec<RwLockReadGuard<'_, HashMap<String, Value>>> {
        self.shards.iter().map(|s| s.read()).collect()
    }

    /// Acquire every shard for a full-document write, in a fixed
    /// ascending order, to avoid deadlocks against concurrent
    /// single-shard writers.
    pub fn write_all(&self) -> Vec<RwLockWriteGuard<'_, HashMap<String, Value>>> {
        self.shards.iter().map(|s| s.write()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_key_always_maps_to_same_shard() {
        let mgr = ShardedLockManager::new(32);
        let idx = mgr.shard_index("meta");
        assert_eq!(mgr.shard_index("meta"), idx);
    }

    #[test]
    fn single_shard_degenerates_gracefully() {
        let mgr = ShardedLockManager::new(0);
        assert_eq!(mgr.shard_count(), 1);
    }

    #[test]
    fn write_then_read_shard_round_trips() {
        let mgr = ShardedLockManager::new(8);
        mgr.write_shard("meta").insert("owner".to_string(), Value::String("alice".into()));
        assert_eq!(
            mgr.read_shard("meta").get("owner"),
            Some(&Value::String("alice".into()))
        );
    }

    #[test]
    fn try_write_shard_by_index_fails_while_held() {
        let mgr = ShardedLockManager::new(4);
        let idx = mgr.shard_index("meta");
        let _held = mgr.write_shard_by_index(idx);
        assert!(mgr
            .try_write_shard_by_index(idx, std::time::Duration::from_millis(20))
            .is_none());
    }

    #[test]
    fn try_write_shard_by_index_succeeds_once_free() {
        let mgr = ShardedLockManager::new(4);
        let idx = mgr.shard_index("meta");
        assert!(mgr
            .try_write_shard_by_index(idx, std::time::Duration::from_millis(20))
            .is_some());
    }
}
