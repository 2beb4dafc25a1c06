// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use dashmap::DashMap;

/// Tracks access counts per key so the tier can report which keys are
/// hottest, independent of eviction scoring (a key can be hot without
/// ever being close to eviction in a tier that isn't full).
#[derive(Default)]
pub struct HotKeyTracker {
    counts: DashMap<String, u64>,
}

impl HotKeyTracker {
    pub fn new() -> Self {
        HotKeyTracker::default()
    }

    pub fn record(&self, key: &str) {
        *self.counts.entry(key.to_string()).or_insert(0) += 1;
    }

    pub fn top(&self, n: usize) -> Vec<(String, u64)> {
        let mut all: Vec<(String, u64)> = self.counts.iter().map(|r| (r.key().clone(), *r.value())).collect();
        all.sort_by(|a, b| b.1.cmp(&a.1));
        all.truncate(n);
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_orders_by_descending_count() {
        let tracker = HotKeyTracker::new();
        for _ in 0..3 {
            tracker.record("a");
        }
        tracker.record("b");
        let top = tracker.top(2);
        assert_eq!(top[0], ("a".to_string(), 3));
        assert_eq!(top[1], ("b".to_string(), 1));
    }
}
