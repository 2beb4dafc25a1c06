// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Turns a dependency graph's waves into a concrete execution plan: for
//! each wave, nodes of the same operator are grouped, and each group is
//! assigned a dispatch `StageKind` — `Batch` for read-only operators
//! cheap enough to amortize into one task, `Parallel` for operators
//! safe to run concurrently against the shared tree, `Sequential` for
//! everything else — per spec §4.10. Reports `OriginalCost` (every node
//! priced independently) against `OptimizedCost` (the plan as actually
//! staged), so callers can see what batching/parallelizing bought.

use std::time::{Duration, Instant};

use std::sync::Arc;

use crate::cost::CostEstimator;
use crate::errors::ValidationError;
use crate::graph::DependencyGraph;
use crate::operator::classify;
use crate::tree::Path;

/// How a stage's nodes are dispatched to the worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    /// One node at a time, in cost-ranked order.
    Sequential,
    /// All nodes submitted as a single task, run in sequence within it,
    /// to amortize per-call overhead for cheap same-operator work.
    Batch,
    /// Every node submitted to the worker pool concurrently.
    Parallel,
}

/// One group of nodes to dispatch together. Every node in a `Stage` is
/// known to have all its dependencies already satisfied by earlier
/// stages.
#[derive(Debug, Clone)]
pub struct Stage {
    pub nodes: Vec<Path>,
    pub kind: StageKind,
}

pub struct ExecutionPlan {
    pub stages: Vec<Stage>,
    /// Sum of every node's cost estimated independently — the cost of
    /// running the graph with no batching or parallelization.
    pub original_cost_ms: f64,
    /// Sum of each stage's actual dispatch cost (batch/parallel-
    /// discounted where applicable).
    pub optimized_cost_ms: f64,
    /// Percentage reduction `optimized_cost_ms` achieves over
    /// `original_cost_ms`. Zero when there's nothing to save.
    pub reduction_pct: f64,
    /// Set when planning hit its timeout before covering every wave;
    /// the plan built so far is returned rather than failing outright.
    pub timed_out: bool,
}

impl ExecutionPlan {
    pub fn node_count(&self) -> usize {
        self.stages.iter().map(|s| s.nodes.len()).sum()
    }
}

pub struct ExecutionPlanner {
    cost: Arc<CostEstimator>,
    max_batch_size: usize,
    max_parallel_ops: usize,
    planning_timeout: Duration,
}

impl ExecutionPlanner {
    pub fn new(cost: Arc<CostEstimator>, max_batch_size: usize, max_parallel_ops: usize, planning_timeout: Duration) -> Self {
        ExecutionPlanner {
            cost,
            max_batch_size: max_batch_size.max(1),
            max_parallel_ops: max_parallel_ops.max(1),
            planning_timeout,
        }
    }

    /// Groups nodes of a wave by operator name, preserving each
    /// operator's first-seen (cost-ranked) order.
    fn group_by_operator(graph: &DependencyGraph, ranked: &[Path]) -> Vec<(String, Vec<Path>)> {
        let mut groups: Vec<(String, Vec<Path>)> = Vec::new();
        for path in ranked {
            let Some(node) = graph.node(path) else { continue };
            let operator = node.expression.operator.clone();
            match groups.iter_mut().find(|(name, _)| name == &operator) {
                Some((_, nodes)) => nodes.push(path.clone()),
                None => groups.push((operator, vec![path.clone()])),
            }
        }
        groups
    }

    pub fn plan(&self, graph: &DependencyGraph) -> Result<ExecutionPlan, ValidationError> {
        let deadline = Instant::now() + self.planning_timeout;
        let waves = graph.compute_waves()?;

        let mut stages = Vec::new();
        let mut original_cost_ms = 0.0;
        let mut optimized_cost_ms = 0.0;
        let mut timed_out = false;

        'waves: for wave in waves {
            if Instant::now() >= deadline {
                timed_out = true;
                break 'waves;
            }

            let ranked = self.cost.rank_wave(&wave, graph);
            original_cost_ms += ranked
                .iter()
                .filter_map(|p| graph.node(p).map(|n| self.cost.estimate_ms(&n.expression.operator, &n.expression)))
                .sum::<f64>();

            for (operator, nodes) in Self::group_by_operator(graph, &ranked) {
                if nodes.len() > 1 && classify::is_batchable(&operator) {
                    for chunk in nodes.chunks(self.max_batch_size) {
                        optimized_cost_ms += self.cost.estimate_batch_cost(graph, chunk);
                        stages.push(Stage {
                            nodes: chunk.to_vec(),
                            kind: StageKind::Batch,
                        });
                    }
                } else if nodes.len() > 1 && classify::is_parallel_safe(&operator) {
                    for chunk in nodes.chunks(self.max_parallel_ops) {
                        optimized_cost_ms += self.cost.estimate_parallel_cost(graph, chunk);
                        stages.push(Stage {
                            nodes: chunk.to_vec(),
                            kind: StageKind::Parallel,
                        });
                    }
                } else {
                    optimized_cost_ms += nodes
                        .iter()
                        .filter_map(|p| {
                            graph.node(p).map(|n| self.cost.estimate_ms(&n.expression.operator, &n.expression))
                        })
                        .sum::<f64>();
                    stages.push(Stage {
                        nodes,
                        kind: StageKind::Sequential,
                    });
                }
            }
        }

        let reduction_pct = if original_cost_ms > 0.0 {
            ((original_cost_ms - optimized_cost_ms) / original_cost_ms) * 100.0
        } else {
            0.0
        };

        Ok(ExecutionPlan {
            stages,
            original_cost_ms,
            optimized_cost_ms,
            reduction_pct,
            timed_out,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DependencyNode, OperatorExpression};

    fn node(target: &str, deps_expr: &str) -> DependencyNode {
        let expr = OperatorExpression::parse(deps_expr).unwrap();
        DependencyNode::new(Path::parse(target).unwrap(), expr)
    }

    fn planner(cost: CostEstimator, max_batch_size: usize) -> ExecutionPlanner {
        ExecutionPlanner::new(Arc::new(cost), max_batch_size, 8, Duration::from_millis(500))
    }

    #[test]
    fn wave_wider_than_batch_size_splits_into_multiple_stages() {
        let graph = DependencyGraph::build(vec![
            node("a", "(( grab seed ))"),
            node("b", "(( grab seed ))"),
            node("c", "(( grab seed ))"),
        ])
        .unwrap();
        let planner = planner(CostEstimator::default(), 2);
        let plan = planner.plan(&graph).unwrap();
        assert_eq!(plan.node_count(), 3);
        assert!(plan.stages.len() >= 2);
    }

    #[test]
    fn single_wave_fits_one_stage_when_under_batch_size() {
        let graph = DependencyGraph::build(vec![node("a", "(( grab seed ))")]).unwrap();
        let planner = planner(CostEstimator::default(), 10);
        let plan = planner.plan(&graph).unwrap();
        assert_eq!(plan.stages.len(), 1);
    }

    #[test]
    fn same_operator_group_becomes_a_batch_stage() {
        let graph = DependencyGraph::build(vec![
            node("a", "(( grab seed ))"),
            node("b", "(( grab seed ))"),
        ])
        .unwrap();
        let planner = planner(CostEstimator::default(), 10);
        let plan = planner.plan(&graph).unwrap();
        assert_eq!(plan.stages.len(), 1);
        assert_eq!(plan.stages[0].kind, StageKind::Batch);
    }

    #[test]
    fn single_unbatchable_operator_is_sequential() {
        let graph = DependencyGraph::build(vec![node("a", "(( empty ))")]).unwrap();
        let planner = planner(CostEstimator::default(), 10);
        let plan = planner.plan(&graph).unwrap();
        assert_eq!(plan.stages[0].kind, StageKind::Sequential);
    }

    #[test]
    fn multiple_empty_calls_dispatch_in_parallel_not_batched() {
        let graph = DependencyGraph::build(vec![node("a", "(( empty ))"), node("b", "(( empty ))")]).unwrap();
        let planner = planner(CostEstimator::default(), 10);
        let plan = planner.plan(&graph).unwrap();
        assert_eq!(plan.stages.len(), 1);
        assert_eq!(plan.stages[0].kind, StageKind::Parallel);
    }

    #[test]
    fn optimized_cost_never_exceeds_original_cost() {
        let graph = DependencyGraph::build(vec![
            node("a", "(( grab seed ))"),
            node("b", "(( grab seed ))"),
            node("c", "(( empty ))"),
            node("d", "(( empty ))"),
        ])
        .unwrap();
        let planner = planner(CostEstimator::default(), 10);
        let plan = planner.plan(&graph).unwrap();
        assert!(plan.optimized_cost_ms <= plan.original_cost_ms);
        assert!(plan.reduction_pct >= 0.0);
    }

    #[test]
    fn zero_timeout_returns_a_partial_plan_without_erroring() {
        let graph = DependencyGraph::build(vec![
            node("a", "(( grab seed ))"),
            node("b", "(( grab a ))"),
        ])
        .unwrap();
        let planner = ExecutionPlanner::new(Arc::new(CostEstimator::default()), 10, 8, Duration::from_millis(0));
        let plan = planner.plan(&graph).unwrap();
        assert!(plan.timed_out);
        assert!(plan.node_count() < 2);
    }
}
