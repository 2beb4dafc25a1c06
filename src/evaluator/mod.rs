// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Drives an `ExecutionPlan` to completion: dispatches each stage's
//! nodes through the worker pool according to its `StageKind`, writes
//! operator results back into the tree, and reconciles failures
//! according to the configured `FailureStrategy`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::cost::CostEstimator;
use crate::errors::{EngineError, EvaluationReport, FailureStrategy};
use crate::graph::{DependencyGraph, DependencyNode};
use crate::metrics::{Metrics, SlowOpDetector, TimerArena};
use crate::observability::messages::engine::{EvaluationCompleted, EvaluationStarted, StageFailed, StageTiming};
use crate::observability::messages::StructuredLog;
use crate::operator::{OperatorContext, OperatorRegistry};
use crate::planner::{ExecutionPlan, Stage, StageKind};
use crate::tree::{Path, PathError, TreeStore};
use crate::worker::WorkerPool;

/// Operator calls at or above this wall-clock time are flagged via
/// `SlowOpDetector`, independent of the cost estimator's EMA.
const SLOW_OP_THRESHOLD: Duration = Duration::from_millis(250);

/// How a single node's write should land: a fresh value replaces
/// whatever was there (the common case), or — for an operator whose
/// semantics are additive (e.g. a future `merge`-style operator) — the
/// result is merged into the existing value instead of overwriting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Replace,
    Inject,
}

fn write_mode_for(operator: &str) -> WriteMode {
    match operator {
        "empty" => WriteMode::Inject,
        _ => WriteMode::Replace,
    }
}

type NodeOutcome = (String, Result<(), EngineError>);

pub struct ParallelEvaluator {
    registry: Arc<OperatorRegistry>,
    workers: WorkerPool,
    cost: Arc<CostEstimator>,
    failure_strategy: FailureStrategy,
    metrics: Arc<Metrics>,
    slow_ops: Arc<SlowOpDetector>,
}

impl ParallelEvaluator {
    pub fn new(
        registry: Arc<OperatorRegistry>,
        workers: WorkerPool,
        cost: Arc<CostEstimator>,
        failure_strategy: FailureStrategy,
    ) -> Self {
        ParallelEvaluator {
            registry,
            workers,
            cost,
            failure_strategy,
            metrics: Arc::new(Metrics::new()),
            slow_ops: Arc::new(SlowOpDetector::new(SLOW_OP_THRESHOLD)),
        }
    }

    /// The counters this evaluator records into: `"evaluator.nodes_ok"`
    /// and `"evaluator.nodes_failed"`.
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// True if any two nodes' target paths overlap (one is a prefix of,
    /// or equal to, another). A parallel group that fails this check
    /// can't safely write back concurrently and is run sequentially
    /// instead (spec §4.11's defensive conflict recheck).
    fn has_write_conflict(nodes: &[Path]) -> bool {
        for (i, a) in nodes.iter().enumerate() {
            for b in &nodes[i + 1..] {
                if a.contains_or_equals(b) || b.contains_or_equals(a) {
                    return true;
                }
            }
        }
        false
    }

    /// Runs a single node's operator and writes its result back,
    /// mapping tree-store errors into the engine's error taxonomy.
    #[allow(clippy::too_many_arguments)]
    async fn run_node(
        registry: &Arc<OperatorRegistry>,
        cost: &Arc<CostEstimator>,
        metrics: &Arc<Metrics>,
        slow_ops: &Arc<SlowOpDetector>,
        tree: &Arc<dyn TreeStore>,
        node: &DependencyNode,
        path: &Path,
        cancellation: &CancellationToken,
    ) -> NodeOutcome {
        let node_id = path.to_string();
        if cancellation.is_cancelled() {
            return (
                node_id,
                Err(EngineError::Cancelled {
                    reason: format!("evaluation cancelled before '{path}' started"),
                }),
            );
        }
        let Some(operator) = registry.get(&node.expression.operator) else {
            metrics.counter("evaluator.nodes_failed").incr();
            return (
                node_id,
                Err(EngineError::OperatorFailure {
                    path: path.to_string(),
                    operator: node.expression.operator.clone(),
                    reason: "operator is not registered".to_string(),
                    remediation: Some("register the operator or check for a typo".to_string()),
                }),
            );
        };

        let ctx = OperatorContext::new(tree.as_ref(), path);
        let start = Instant::now();
        let result = operator.run(&ctx, &node.expression.args).await;
        let elapsed = start.elapsed();
        cost.record(&node.expression.operator, elapsed);
        slow_ops.check(&node_id, &node.expression.operator, elapsed);

        let outcome = result.and_then(|value| {
            match write_mode_for(&node.expression.operator) {
                WriteMode::Replace => tree.set(path, value),
                WriteMode::Inject => tree.merge(path, value),
            }
            .map_err(|e| map_write_error(path, e))
        });
        metrics.counter(if outcome.is_ok() { "evaluator.nodes_ok" } else { "evaluator.nodes_failed" }).incr();
        (node_id, outcome)
    }

    /// Dispatches one stage according to its `kind`, returning each
    /// node's outcome.
    async fn dispatch_stage(
        &self,
        stage: &Stage,
        graph: &DependencyGraph,
        tree: &Arc<dyn TreeStore>,
        cancellation: &CancellationToken,
    ) -> Vec<NodeOutcome> {
        let nodes: Vec<(Path, DependencyNode)> = stage
            .nodes
            .iter()
            .filter_map(|p| graph.node(p).map(|n| (p.clone(), n.clone())))
            .collect();

        let effective_kind = if stage.kind == StageKind::Parallel
            && Self::has_write_conflict(&nodes.iter().map(|(p, _)| p.clone()).collect::<Vec<_>>())
        {
            StageKind::Sequential
        } else {
            stage.kind
        };

        match effective_kind {
            StageKind::Sequential | StageKind::Batch => {
                // A batch shares one worker-pool task so its per-call
                // overhead is paid once; a sequential stage is run the
                // same way but conceptually one node at a time — both
                // dispatch paths are a single task that walks its nodes
                // in order, which is what "submitted as a single task"
                // means for an in-process worker pool.
                let registry = self.registry.clone();
                let cost = self.cost.clone();
                let metrics = self.metrics.clone();
                let slow_ops = self.slow_ops.clone();
                let tree = tree.clone();
                let token = cancellation.clone();
                let handle = self.workers.spawn(async move {
                    let mut outcomes = Vec::with_capacity(nodes.len());
                    for (path, node) in &nodes {
                        outcomes.push(Self::run_node(&registry, &cost, &metrics, &slow_ops, &tree, node, path, &token).await);
                    }
                    outcomes
                });
                match handle.await {
                    Ok(outcomes) => outcomes,
                    Err(join_err) => vec![(
                        "<unknown>".to_string(),
                        Err(EngineError::internal(format!("worker task panicked: {join_err}"))),
                    )],
                }
            }
            StageKind::Parallel => {
                let mut handles = Vec::with_capacity(nodes.len());
                for (path, node) in nodes {
                    let registry = self.registry.clone();
                    let cost = self.cost.clone();
                    let metrics = self.metrics.clone();
                    let slow_ops = self.slow_ops.clone();
                    let tree = tree.clone();
                    let token = cancellation.clone();
                    handles.push(self.workers.spawn(async move {
                        Self::run_node(&registry, &cost, &metrics, &slow_ops, &tree, &node, &path, &token).await
                    }));
                }
                let mut outcomes = Vec::with_capacity(handles.len());
                for handle in handles {
                    outcomes.push(match handle.await {
                        Ok(outcome) => outcome,
                        Err(join_err) => (
                            "<unknown>".to_string(),
                            Err(EngineError::internal(format!("worker task panicked: {join_err}"))),
                        ),
                    });
                }
                outcomes
            }
        }
    }

    pub async fn evaluate(
        &self,
        plan: &ExecutionPlan,
        graph: &DependencyGraph,
        tree: &Arc<dyn TreeStore>,
        cancellation: &CancellationToken,
    ) -> Result<(), EvaluationReport> {
        let started = Instant::now();
        EvaluationStarted {
            node_count: plan.node_count(),
            wave_count: plan.stages.len(),
            strategy: &format!("{:?}", self.failure_strategy),
        }
        .log();

        let mut first_error: Option<EngineError> = None;
        let mut subsequent = Vec::new();
        let mut skipped = Vec::new();

        let timers = TimerArena::new();
        let root_timer = timers.start("evaluation", None);

        'stages: for (stage_index, stage) in plan.stages.iter().enumerate() {
            if cancellation.is_cancelled() {
                skipped.extend(stage.nodes.iter().map(Path::to_string));
                continue;
            }

            let stage_timer = timers.start(format!("stage[{stage_index}]:{:?}", stage.kind), Some(root_timer));
            let outcomes = self.dispatch_stage(stage, graph, tree, cancellation).await;
            timers.stop(stage_timer);

            for (node_id, outcome) in outcomes {
                if let Err(err) = outcome {
                    StageFailed {
                        stage_index,
                        node_id: &node_id,
                        error: &err,
                    }
                    .log();
                    match self.failure_strategy {
                        FailureStrategy::FailFast => {
                            cancellation.cancel();
                            first_error = Some(err);
                            break 'stages;
                        }
                        FailureStrategy::ContinueOnError | FailureStrategy::BestEffort => {
                            if first_error.is_none() {
                                first_error = Some(err);
                            } else {
                                subsequent.push(err);
                            }
                        }
                    }
                }
            }
        }

        timers.stop(root_timer);
        for (depth, label, duration) in timers.render() {
            StageTiming { depth, label: &label, duration }.log();
        }

        EvaluationCompleted {
            node_count: plan.node_count(),
            duration: started.elapsed(),
        }
        .log();

        match first_error {
            Some(first) => Err(EvaluationReport { first, subsequent, skipped }),
            None => Ok(()),
        }
    }
}

fn map_write_error(path: &Path, e: PathError) -> EngineError {
    match e {
        PathError::LockTimeout { path: p, timeout_ms } => EngineError::LockTimeout {
            path: p,
            timeout: std::time::Duration::from_millis(timeout_ms),
        },
        other => EngineError::Internal {
            message: format!("writing result for '{path}' failed: {other}"),
        },
    }
}
