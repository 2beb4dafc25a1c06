// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Per-operator cost estimation, used to order nodes within a wave so
//! the planner can dispatch the likely-slowest work first, to size
//! batch/parallel groups, and to surface `OptimizeCosts` suggestions
//! (spec §4.9).

use std::collections::HashMap;
use std::time::Duration;

use dashmap::DashMap;

use crate::graph::{Arg, DependencyGraph, OperatorExpression};
use crate::operator::classify;
use crate::tree::Path;

const DEFAULT_COST_MS: f64 = 1.0;
/// Per-additional-item batching discount for operators that cross a
/// process/network boundary.
const EXTERNAL_BATCH_DISCOUNT: f64 = 0.05;
/// Per-additional-item batching discount for in-process operators.
const INTERNAL_BATCH_DISCOUNT: f64 = 0.1;
/// Coordination overhead discount applied to `estimate_parallel_cost`.
const PARALLEL_COORDINATION_FACTOR: f64 = 0.8;

/// Flat per-operator base cost before any complexity multiplier,
/// reflecting "cheap string/arithmetic ops ≪ external-I/O ops".
/// Unregistered/unknown operators are assumed external-I/O-shaped
/// until proven otherwise.
fn base_cost_ms(operator: &str) -> f64 {
    match operator {
        "empty" => 0.2,
        "grab" => 0.5,
        "concat" | "keys" | "join" | "stringify" => 1.0,
        "base64" | "base64-decode" | "sort" => 1.5,
        _ => 5.0,
    }
}

/// Approximate reconstructed source length of an expression. Raw
/// source text isn't retained past parsing, so this walks the parsed
/// `Arg` tree instead of re-measuring the original string.
fn expression_length(expr: &OperatorExpression) -> usize {
    expr.operator.len() + expr.args.iter().map(arg_length).sum::<usize>()
}

fn arg_length(arg: &Arg) -> usize {
    match arg {
        Arg::Reference(p) => p.as_dotted().len(),
        Arg::Literal(v) => v.to_string().len(),
        Arg::Nested(nested) => expression_length(nested) + 4, // "((" + "))"
    }
}

/// How many levels of `(( ... ))` nesting an expression's arguments go
/// through. A flat call has depth 0.
fn nested_depth(expr: &OperatorExpression) -> usize {
    expr.args
        .iter()
        .map(|a| match a {
            Arg::Nested(n) => 1 + nested_depth(n),
            _ => 0,
        })
        .max()
        .unwrap_or(0)
}

/// True if any argument references a sequence index (a numeric path
/// segment), directly or through a nested call.
fn uses_list_or_index(expr: &OperatorExpression) -> bool {
    expr.args.iter().any(|a| match a {
        Arg::Reference(p) => p.segments().iter().any(|s| s.parse::<usize>().is_ok()),
        Arg::Nested(n) => uses_list_or_index(n),
        Arg::Literal(_) => false,
    })
}

/// Combines the three complexity multipliers spec §4.9 names: length,
/// nesting depth, and list/index usage.
fn complexity_multiplier(expr: &OperatorExpression) -> f64 {
    let mut multiplier = 1.0;
    let len = expression_length(expr);
    if len > 500 {
        multiplier *= 1.5;
    } else if len > 100 {
        multiplier *= 1.2;
    }
    let depth = nested_depth(expr);
    if depth > 1 {
        multiplier *= 1.0 + 0.2 * (depth - 1) as f64;
    }
    if uses_list_or_index(expr) {
        multiplier *= 1.3;
    }
    multiplier
}

/// A suggestion `OptimizeCosts` surfaces for a node whose estimated
/// cost clears the configured threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct CostSuggestion {
    pub node: Path,
    pub operator: String,
    pub estimated_ms: f64,
    pub suggestion: String,
}

/// Tracks an exponential moving average of wall-clock cost per
/// operator name. A fresh estimator has no history, so it falls back
/// to `base_cost_ms(operator) * complexity_multiplier(expr)` until
/// enough runs have been recorded — once real timings exist, they're
/// trusted directly rather than re-multiplied, since the observed
/// duration already reflects whatever complexity that call had.
pub struct CostEstimator {
    ema_ms: DashMap<String, f64>,
    alpha: f64,
}

impl CostEstimator {
    pub fn new(alpha: f64) -> Self {
        CostEstimator {
            ema_ms: DashMap::new(),
            alpha,
        }
    }

    /// Estimated cost in milliseconds for one call to `operator` shaped
    /// like `expr`.
    pub fn estimate_ms(&self, operator: &str, expr: &OperatorExpression) -> f64 {
        if let Some(observed) = self.ema_ms.get(operator) {
            return *observed;
        }
        base_cost_ms(operator) * complexity_multiplier(expr)
    }

    pub fn record(&self, operator: &str, elapsed: Duration) {
        let sample = elapsed.as_secs_f64() * 1000.0;
        self.ema_ms
            .entry(operator.to_string())
            .and_modify(|ema| *ema = self.alpha * sample + (1.0 - self.alpha) * *ema)
            .or_insert(sample);
    }

    /// Orders a wave's nodes by descending estimated cost, breaking
    /// ties by path for determinism, so the planner can hand the
    /// worker pool its most expensive work first.
    pub fn rank_wave(&self, wave: &[Path], graph: &DependencyGraph) -> Vec<Path> {
        let mut ranked: Vec<(Path, f64)> = wave
            .iter()
            .map(|p| {
                let cost = graph
                    .node(p)
                    .map(|n| self.estimate_ms(&n.expression.operator, &n.expression))
                    .unwrap_or(DEFAULT_COST_MS);
                (p.clone(), cost)
            })
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap().then_with(|| a.0.cmp(&b.0)));
        ranked.into_iter().map(|(p, _)| p).collect()
    }

    /// Cost of dispatching `nodes` as same-operator batches: the first
    /// item in each operator group costs its full estimate, and every
    /// additional item in that group costs only a discounted fraction
    /// of its own estimate (spec §4.9's batching discount).
    pub fn estimate_batch_cost(&self, graph: &DependencyGraph, nodes: &[Path]) -> f64 {
        let mut by_operator: HashMap<&str, Vec<f64>> = HashMap::new();
        for path in nodes {
            let Some(node) = graph.node(path) else { continue };
            let cost = self.estimate_ms(&node.expression.operator, &node.expression);
            by_operator.entry(node.expression.operator.as_str()).or_default().push(cost);
        }

        by_operator
            .into_iter()
            .map(|(operator, costs)| {
                let discount = if classify::is_external(operator) {
                    EXTERNAL_BATCH_DISCOUNT
                } else {
                    INTERNAL_BATCH_DISCOUNT
                };
                let Some((first, rest)) = costs.split_first() else {
                    return 0.0;
                };
                first + rest.iter().map(|c| c * discount).sum::<f64>()
            })
            .sum()
    }

    /// Cost of dispatching `nodes` as one parallel group: the slowest
    /// member's cost, discounted by the coordination factor (spec
    /// §4.9's `max(costs) × 0.8`).
    pub fn estimate_parallel_cost(&self, graph: &DependencyGraph, nodes: &[Path]) -> f64 {
        let max_cost = nodes
            .iter()
            .filter_map(|p| graph.node(p).map(|n| self.estimate_ms(&n.expression.operator, &n.expression)))
            .fold(0.0_f64, f64::max);
        max_cost * PARALLEL_COORDINATION_FACTOR
    }

    /// Suggestions for nodes whose estimated cost exceeds
    /// `threshold_ms`, ordered from most to least expensive.
    pub fn optimize_costs(&self, graph: &DependencyGraph, threshold_ms: f64) -> Vec<CostSuggestion> {
        let mut suggestions: Vec<CostSuggestion> = graph
            .nodes()
            .filter_map(|node| {
                let cost = self.estimate_ms(&node.expression.operator, &node.expression);
                if cost <= threshold_ms {
                    return None;
                }
                let suggestion = if classify::is_batchable(&node.expression.operator) {
                    "batch this operator with others of the same type to amortize cost".to_string()
                } else {
                    "cache this call's result; it won't benefit from batching".to_string()
                };
                Some(CostSuggestion {
                    node: node.target.clone(),
                    operator: node.expression.operator.clone(),
                    estimated_ms: cost,
                    suggestion,
                })
            })
            .collect();
        suggestions.sort_by(|a, b| b.estimated_ms.partial_cmp(&a.estimated_ms).unwrap());
        suggestions
    }
}

impl Default for CostEstimator {
    fn default() -> Self {
        CostEstimator::new(0.2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DependencyNode, OperatorExpression as Expr};

    fn node(target: &str, deps_expr: &str) -> DependencyNode {
        let expr = Expr::parse(deps_expr).unwrap();
        DependencyNode::new(Path::parse(target).unwrap(), expr)
    }

    fn expr(raw: &str) -> OperatorExpression {
        OperatorExpression::parse(raw).unwrap()
    }

    #[test]
    fn unknown_operator_falls_back_to_external_default() {
        let est = CostEstimator::default();
        let e = expr("(( shell-exec a ))");
        assert_eq!(est.estimate_ms("shell-exec", &e), base_cost_ms("shell-exec"));
    }

    #[test]
    fn known_operator_uses_its_base_cost_with_no_history() {
        let est = CostEstimator::default();
        let e = expr("(( grab a ))");
        assert_eq!(est.estimate_ms("grab", &e), base_cost_ms("grab"));
    }

    #[test]
    fn record_moves_estimate_toward_sample() {
        let est = CostEstimator::new(0.5);
        let e = expr("(( grab a ))");
        est.record("slow-op", Duration::from_millis(100));
        let first = est.estimate_ms("slow-op", &e);
        assert!(first > DEFAULT_COST_MS);
        est.record("slow-op", Duration::from_millis(100));
        let second = est.estimate_ms("slow-op", &e);
        assert!(second >= first);
    }

    #[test]
    fn long_expression_gets_a_higher_complexity_multiplier() {
        let short = expr("(( grab a ))");
        let long_path = format!("(( grab {} ))", "segment.".repeat(30));
        let long = expr(&long_path);
        assert!(expression_length(&long) > expression_length(&short));
        assert!(complexity_multiplier(&long) > complexity_multiplier(&short));
    }

    #[test]
    fn nested_expression_raises_depth() {
        let flat = expr("(( grab a ))");
        let nested = expr("(( concat (( grab a )) (( grab b )) ))");
        assert_eq!(nested_depth(&flat), 0);
        assert_eq!(nested_depth(&nested), 1);
    }

    #[test]
    fn index_reference_is_detected() {
        let indexed = expr("(( grab items.0.name ))");
        let plain = expr("(( grab meta.owner ))");
        assert!(uses_list_or_index(&indexed));
        assert!(!uses_list_or_index(&plain));
    }

    #[test]
    fn batch_cost_discounts_every_item_after_the_first() {
        let est = CostEstimator::default();
        let graph = DependencyGraph::build(vec![node("a", "(( grab seed ))"), node("b", "(( grab seed ))")]).unwrap();
        let nodes = vec![Path::parse("a").unwrap(), Path::parse("b").unwrap()];
        let batch_cost = est.estimate_batch_cost(&graph, &nodes);
        let sequential_cost: f64 = nodes
            .iter()
            .map(|p| est.estimate_ms(&graph.node(p).unwrap().expression.operator, &graph.node(p).unwrap().expression))
            .sum();
        assert!(batch_cost < sequential_cost);
    }

    #[test]
    fn parallel_cost_is_the_slowest_member_times_the_coordination_factor() {
        let est = CostEstimator::default();
        let graph = DependencyGraph::build(vec![node("a", "(( grab seed ))"), node("b", "(( sort seed ))")]).unwrap();
        let nodes = vec![Path::parse("a").unwrap(), Path::parse("b").unwrap()];
        let cost = est.estimate_parallel_cost(&graph, &nodes);
        assert_eq!(cost, base_cost_ms("sort") * PARALLEL_COORDINATION_FACTOR);
    }

    #[test]
    fn optimize_costs_reports_only_nodes_above_threshold() {
        let est = CostEstimator::default();
        let graph = DependencyGraph::build(vec![node("a", "(( empty ))"), node("b", "(( unknown-op x ))")]).unwrap();
        let suggestions = est.optimize_costs(&graph, 1.0);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].operator, "unknown-op");
    }

    #[test]
    fn default_alpha_matches_the_configured_smoothing_factor() {
        assert_eq!(CostEstimator::default().alpha, 0.2);
    }
}
