// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::path::PathBuf;

use serde::Deserialize;

use crate::errors::FailureStrategy;

fn default_max_workers() -> usize {
    8
}

fn default_shard_count() -> usize {
    32
}

fn default_queue_size() -> usize {
    256
}

fn default_worker_idle_timeout_seconds() -> u64 {
    60
}

fn default_max_parallel_ops() -> usize {
    8
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    pub max_workers: usize,
    pub shard_count: usize,
    /// Bound on the worker pool's pending-task queue. `Submit` past
    /// this depth reports `queueFull` instead of enqueuing (spec §4.7).
    pub queue_size: usize,
    /// How long an idle worker waits for new work before it's eligible
    /// to be reclaimed.
    pub worker_idle_timeout_seconds: u64,
    /// Upper bound on concurrently dispatched tasks within one
    /// parallel group (spec §4.10/§5's `MaxParallelOps`).
    pub max_parallel_ops: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        ConcurrencyConfig {
            max_workers: default_max_workers(),
            shard_count: default_shard_count(),
            queue_size: default_queue_size(),
            worker_idle_timeout_seconds: default_worker_idle_timeout_seconds(),
            max_parallel_ops: default_max_parallel_ops(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub l1_max_entries: usize,
    pub default_ttl_seconds: u64,
    pub l2_path: Option<PathBuf>,
    /// How often L1 is flushed to L2, in seconds. `0` disables the
    /// background sync entirely — L2 is then only written inline on
    /// `put`, per DESIGN.md's "sync_interval_seconds=0 -> disabled".
    pub sync_interval_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            l1_max_entries: 10_000,
            default_ttl_seconds: 300,
            l2_path: None,
            sync_interval_seconds: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    pub timeout_seconds: u64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        DedupConfig { timeout_seconds: 30 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CostConfig {
    pub ema_alpha: f64,
    pub max_batch_size: usize,
    /// Upper bound on how long planning may run before returning the
    /// partial plan built so far (spec §4.10).
    pub planning_timeout_ms: u64,
}

impl Default for CostConfig {
    fn default() -> Self {
        CostConfig {
            ema_alpha: 0.2,
            max_batch_size: 64,
            planning_timeout_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub failure_strategy: FailureStrategy,
    pub concurrency: ConcurrencyConfig,
    pub cache: CacheConfig,
    pub dedup: DedupConfig,
    pub cost: CostConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            failure_strategy: FailureStrategy::default(),
            concurrency: ConcurrencyConfig::default(),
            cache: CacheConfig::default(),
            dedup: DedupConfig::default(),
            cost: CostConfig::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

pub fn load_config(raw: &str) -> Result<Config, ConfigError> {
    Ok(serde_yaml::from_str(raw)?)
}

pub fn load_config_from_path(path: &std::path::Path) -> Result<Config, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    load_config(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_loads_all_defaults() {
        let config = load_config("").unwrap();
        assert_eq!(config.concurrency.max_workers, 8);
        assert_eq!(config.cache.l1_max_entries, 10_000);
        assert_eq!(config.failure_strategy, FailureStrategy::FailFast);
    }

    #[test]
    fn partial_document_overrides_only_named_fields() {
        let config = load_config(
            r#"
concurrency:
  max_workers: 16
failure_strategy: best_effort
"#,
        )
        .unwrap();
        assert_eq!(config.concurrency.max_workers, 16);
        assert_eq!(config.concurrency.shard_count, 32);
        assert_eq!(config.failure_strategy, FailureStrategy::BestEffort);
    }
}
