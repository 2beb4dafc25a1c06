// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::metrics::Metrics;
use crate::observability::messages::cache::CacheEvicted;
use crate::observability::messages::StructuredLog;
use crate::tree::Value;

use super::hotkey::HotKeyTracker;
use super::l1::ShardedL1Cache;
use super::l2::L2Cache;

pub struct CacheTierConfig {
    pub l1_max_entries: usize,
    pub default_ttl: Duration,
    pub l2_path: Option<PathBuf>,
    /// How often the background janitor re-persists any L1 entry
    /// missing from L2 (self-healing after an inline write failure).
    /// `0` disables the janitor entirely — see DESIGN.md.
    pub sync_interval: Duration,
}

impl Default for CacheTierConfig {
    fn default() -> Self {
        CacheTierConfig {
            l1_max_entries: 10_000,
            default_ttl: Duration::from_secs(300),
            l2_path: None,
            sync_interval: Duration::ZERO,
        }
    }
}

/// Two-tier cache: a fast in-memory L1 in front of an optional
/// on-disk L2. A miss in L1 that hits L2 is promoted back into L1; an
/// L1 eviction is not demoted into L2 automatically — only `put`
/// writes both tiers, keeping the disk tier a durable superset rather
/// than a spillover buffer that needs its own eviction policy.
pub struct CacheTier {
    l1: ShardedL1Cache,
    l2: Option<L2Cache>,
    hot_keys: HotKeyTracker,
    default_ttl: Duration,
    metrics: Arc<Metrics>,
}

impl CacheTier {
    pub fn new(config: CacheTierConfig) -> std::io::Result<Self> {
        let l2 = config.l2_path.map(L2Cache::open).transpose()?;
        Ok(CacheTier {
            l1: ShardedL1Cache::new(config.l1_max_entries),
            l2,
            hot_keys: HotKeyTracker::new(),
            default_ttl: config.default_ttl,
            metrics: Arc::new(Metrics::new()),
        })
    }

    /// The counters/gauges/histograms this tier records hits, misses,
    /// and size into — `"cache.hits"`, `"cache.misses"`.
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn hit_rate(&self) -> f64 {
        let hits = self.metrics.counter("cache.hits").get() as f64;
        let misses = self.metrics.counter("cache.misses").get() as f64;
        if hits + misses == 0.0 {
            0.0
        } else {
            hits / (hits + misses)
        }
    }

    /// Spawns the background sync janitor if `interval` is non-zero.
    /// Must be called on an already-`Arc`'d tier since the task
    /// outlives the call that starts it.
    pub fn spawn_janitor(self: &Arc<Self>, interval: Duration) {
        if interval.is_zero() {
            return;
        }
        let tier = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                tier.resync_l1_into_l2();
            }
        });
    }

    fn resync_l1_into_l2(&self) {
        let Some(l2) = &self.l2 else { return };
        for (key, entry) in self.l1.iter_snapshot() {
            if l2.get(&key).is_none() {
                if let Err(e) = l2.put(key.clone(), entry.value) {
                    CacheEvicted {
                        tier: "l2",
                        key: &key,
                        reason: &format!("janitor resync failed: {e}"),
                    }
                    .log();
                }
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.hot_keys.record(key);
        if let Some(value) = self.l1.get(key) {
            self.metrics.counter("cache.hits").incr();
            return Some(value);
        }
        let Some(l2) = self.l2.as_ref() else {
            self.metrics.counter("cache.misses").incr();
            return None;
        };
        let Some(value) = l2.get(key) else {
            self.metrics.counter("cache.misses").incr();
            return None;
        };
        self.metrics.counter("cache.hits").incr();
        self.l1.put(key.to_string(), value.clone(), self.default_ttl);
        Some(value)
    }

    pub fn put(&self, key: String, value: Value) {
        self.l1.put(key.clone(), value.clone(), self.default_ttl);
        if let Some(l2) = &self.l2 {
            if let Err(e) = l2.put(key.clone(), value) {
                CacheEvicted {
                    tier: "l2",
                    key: &key,
                    reason: &format!("write failed: {e}"),
                }
                .log();
            }
        }
    }

    pub fn put_with_ttl(&self, key: String, value: Value, ttl: Duration) {
        self.l1.put(key, value, ttl);
    }

    pub fn hot_keys(&self, n: usize) -> Vec<(String, u64)> {
        self.hot_keys.top(n)
    }

    pub fn l1_len(&self) -> usize {
        self.l1.len()
    }

    pub fn l2_len(&self) -> usize {
        self.l2.as_ref().map(L2Cache::len).unwrap_or(0)
    }
}
