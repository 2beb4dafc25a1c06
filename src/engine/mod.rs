// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The engine's entry point: parses a document's operator expressions
//! into a dependency graph, plans it into cost-ranked waves, and
//! evaluates those waves concurrently against a shared tree store.

mod extract;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::cache::{CacheTier, CacheTierConfig};
use crate::config::Config;
use crate::cost::CostEstimator;
use crate::dedup::Deduplicator;
use crate::errors::{EngineError, EvaluationReport};
use crate::evaluator::ParallelEvaluator;
use crate::graph::DependencyGraph;
use crate::operator::adapter::ThreadSafeOperatorAdapter;
use crate::operator::{Operator, OperatorRegistry};
use crate::planner::ExecutionPlanner;
use crate::tree::{ShardedTree, TreeStore, Value};
use crate::worker::WorkerPool;

/// Owns the subsystems a document evaluation needs and wires them
/// together the same way on every call: extract nodes, build the
/// graph, plan it, evaluate it.
pub struct Engine {
    config: Config,
    registry: Arc<OperatorRegistry>,
    cache: Arc<CacheTier>,
    dedup: Arc<Deduplicator>,
    cost: Arc<CostEstimator>,
}

impl Engine {
    pub fn new(config: Config) -> Result<Self, EngineError> {
        let sync_interval = std::time::Duration::from_secs(config.cache.sync_interval_seconds);
        let cache = Arc::new(
            CacheTier::new(CacheTierConfig {
                l1_max_entries: config.cache.l1_max_entries,
                default_ttl: std::time::Duration::from_secs(config.cache.default_ttl_seconds),
                l2_path: config.cache.l2_path.clone(),
                sync_interval,
            })
            .map_err(|e| EngineError::internal(format!("failed to open cache: {e}")))?,
        );
        cache.spawn_janitor(sync_interval);
        let dedup = Deduplicator::new(std::time::Duration::from_secs(config.dedup.timeout_seconds));
        let cost = Arc::new(CostEstimator::new(config.cost.ema_alpha));
        let registry = Arc::new(Self::wrap_registry(OperatorRegistry::with_builtins(), &cache, &dedup));

        Ok(Engine {
            config,
            registry,
            cache,
            dedup,
            cost,
        })
    }

    /// Every builtin is wrapped in the thread-safe adapter so all
    /// operator calls get fingerprinting, the cache short-circuit, and
    /// dedup uniformly — not just ones that declare `ExclusiveAccess`.
    fn wrap_registry(raw: OperatorRegistry, cache: &Arc<CacheTier>, dedup: &Arc<Deduplicator>) -> OperatorRegistry {
        let mut wrapped = OperatorRegistry::new();
        for name in [
            "grab", "concat", "base64", "base64-decode", "keys", "empty", "join", "sort", "stringify",
        ] {
            if let Some(op) = raw.get(name) {
                let adapted = ThreadSafeOperatorAdapter::new(op)
                    .with_cache(cache.clone())
                    .with_dedup(dedup.clone());
                wrapped.register(Arc::new(adapted) as Arc<dyn Operator>);
            }
        }
        wrapped
    }

    pub fn cache(&self) -> &Arc<CacheTier> {
        &self.cache
    }

    /// Registers an operator beyond the builtin set, wrapped in the
    /// same thread-safe adapter the builtins get.
    pub fn register_operator(&mut self, operator: Arc<dyn Operator>) {
        let adapted = ThreadSafeOperatorAdapter::new(operator)
            .with_cache(self.cache.clone())
            .with_dedup(self.dedup.clone());
        Arc::get_mut(&mut self.registry)
            .expect("register_operator called before engine is shared")
            .register(Arc::new(adapted));
    }

    /// Evaluates `document`'s operator expressions to completion and
    /// returns the fully-resolved document. On failure, the first
    /// error plus any subsequent ones collected under
    /// `ContinueOnError`/`BestEffort` are reported together.
    pub async fn evaluate(&self, document: Value) -> Result<Value, EvaluationReport> {
        let nodes = extract::extract_nodes(&document).map_err(|e| EvaluationReport {
            first: e,
            subsequent: Vec::new(),
            skipped: Vec::new(),
        })?;

        let graph = DependencyGraph::build(nodes).map_err(|e| EvaluationReport {
            first: EngineError::Planning { reason: e.to_string() },
            subsequent: Vec::new(),
            skipped: Vec::new(),
        })?;

        let planner = ExecutionPlanner::new(
            self.cost.clone(),
            self.config.cost.max_batch_size,
            self.config.concurrency.max_parallel_ops,
            std::time::Duration::from_millis(self.config.cost.planning_timeout_ms),
        );
        let plan = planner.plan(&graph).map_err(|e| EvaluationReport {
            first: EngineError::Planning { reason: e.to_string() },
            subsequent: Vec::new(),
            skipped: Vec::new(),
        })?;

        let tree: Arc<dyn TreeStore> = Arc::new(ShardedTree::with_root(self.config.concurrency.shard_count, document));
        let workers = WorkerPool::with_queue_size(self.config.concurrency.max_workers, self.config.concurrency.queue_size)
            .with_idle_timeout(std::time::Duration::from_secs(
                self.config.concurrency.worker_idle_timeout_seconds,
            ));
        let evaluator = ParallelEvaluator::new(self.registry.clone(), workers, self.cost.clone(), self.config.failure_strategy);
        let cancellation = CancellationToken::new();

        evaluator.evaluate(&plan, &graph, &tree, &cancellation).await?;

        Ok(tree.root())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn evaluates_a_simple_chain_of_expressions() {
        let engine = Engine::new(Config::default()).unwrap();
        let doc = Value::Map(HashMap::from([
            ("seed".to_string(), Value::String("alice".to_string())),
            ("owner".to_string(), Value::String("(( grab seed ))".to_string())),
        ]));
        let result = engine.evaluate(doc).await.unwrap();
        let map = result.as_map().unwrap();
        assert_eq!(map.get("owner"), Some(&Value::String("alice".to_string())));
    }

    #[tokio::test]
    async fn reports_reference_failure_for_missing_path() {
        let engine = Engine::new(Config::default()).unwrap();
        let doc = Value::Map(HashMap::from([(
            "owner".to_string(),
            Value::String("(( grab missing.path ))".to_string()),
        )]));
        let err = engine.evaluate(doc).await.unwrap_err();
        assert!(matches!(err.first, EngineError::Reference { .. }));
    }

    #[tokio::test]
    async fn cyclic_dependency_is_reported_as_planning_error() {
        let engine = Engine::new(Config::default()).unwrap();
        let doc = Value::Map(HashMap::from([
            ("a".to_string(), Value::String("(( grab b ))".to_string())),
            ("b".to_string(), Value::String("(( grab a ))".to_string())),
        ]));
        let err = engine.evaluate(doc).await.unwrap_err();
        assert!(matches!(err.first, EngineError::Planning { .. }));
    }
}
