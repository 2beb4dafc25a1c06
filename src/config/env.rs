// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Environment-variable overrides applied on top of a loaded `Config`,
//! so deployment-specific tuning (worker count, cache size) doesn't
//! require editing the document on disk.

use std::env;

use super::loader::Config;

const PREFIX: &str = "GRAFTWOOD_";

fn var(name: &str) -> Option<String> {
    env::var(format!("{PREFIX}{name}")).ok()
}

/// Applies any recognized `GRAFTWOOD_*` environment variables to
/// `config` in place. Unrecognized or malformed values are ignored
/// rather than rejected — environment overrides are a convenience,
/// not a second validation layer.
pub fn apply_env_overrides(config: &mut Config) {
    if let Some(v) = var("MAX_WORKERS").and_then(|s| s.parse().ok()) {
        config.concurrency.max_workers = v;
    }
    if let Some(v) = var("SHARD_COUNT").and_then(|s| s.parse().ok()) {
        config.concurrency.shard_count = v;
    }
    if let Some(v) = var("CACHE_L1_MAX_ENTRIES").and_then(|s| s.parse().ok()) {
        config.cache.l1_max_entries = v;
    }
    if let Some(v) = var("CACHE_L2_PATH") {
        config.cache.l2_path = Some(v.into());
    }
    if let Some(v) = var("DEDUP_TIMEOUT_SECONDS").and_then(|s| s.parse().ok()) {
        config.dedup.timeout_seconds = v;
    }
    if let Some(v) = var("QUEUE_SIZE").and_then(|s| s.parse().ok()) {
        config.concurrency.queue_size = v;
    }
    if let Some(v) = var("WORKER_IDLE_TIMEOUT_SECONDS").and_then(|s| s.parse().ok()) {
        config.concurrency.worker_idle_timeout_seconds = v;
    }
    if let Some(v) = var("MAX_PARALLEL_OPS").and_then(|s| s.parse().ok()) {
        config.concurrency.max_parallel_ops = v;
    }
    if let Some(v) = var("COST_EMA_ALPHA").and_then(|s| s.parse().ok()) {
        config.cost.ema_alpha = v;
    }
    if let Some(v) = var("PLANNING_TIMEOUT_MS").and_then(|s| s.parse().ok()) {
        config.cost.planning_timeout_ms = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn override_applies_when_var_is_set() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("GRAFTWOOD_MAX_WORKERS", "16");
        let mut config = Config::default();
        apply_env_overrides(&mut config);
        assert_eq!(config.concurrency.max_workers, 16);
        env::remove_var("GRAFTWOOD_MAX_WORKERS");
    }

    #[test]
    fn malformed_value_is_ignored() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("GRAFTWOOD_MAX_WORKERS", "not-a-number");
        let mut config = Config::default();
        apply_env_overrides(&mut config);
        assert_eq!(config.concurrency.max_workers, 8);
        env::remove_var("GRAFTWOOD_MAX_WORKERS");
    }
}
