// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Dependency-graph construction over the document's operator
//! expressions, and wave computation for parallel scheduling.

pub mod expression;
mod node;

use std::collections::{HashMap, HashSet};

pub use expression::{Arg, ExpressionParseError, OperatorExpression};
pub use node::{DependencyNode, Wave};

use crate::errors::ValidationError;
use crate::tree::Path;

/// Forward adjacency from a node to the nodes that depend on it
/// (mirrors the processor-keyed adjacency teacher code builds, here
/// keyed by document path instead of processor id).
pub struct DependencyGraph {
    nodes: HashMap<Path, DependencyNode>,
    dependents: HashMap<Path, Vec<Path>>,
}

impl DependencyGraph {
    pub fn build(nodes: Vec<DependencyNode>) -> Result<DependencyGraph, ValidationError> {
        let mut by_target: HashMap<Path, DependencyNode> = HashMap::new();
        for node in nodes {
            if by_target.contains_key(&node.target) {
                return Err(ValidationError::DuplicateNodeId {
                    node_id: node.target.to_string(),
                });
            }
            by_target.insert(node.target.clone(), node);
        }

        let mut dependents: HashMap<Path, Vec<Path>> = HashMap::new();
        for node in by_target.values() {
            for dep in &node.dependencies {
                let Some(target) = Self::resolve_dependency(&by_target, dep) else {
                    // A reference that isn't covered by any node's target
                    // is a read of plain document data, not another
                    // operator — not an error.
                    continue;
                };
                dependents.entry(target.clone()).or_default().push(node.target.clone());
            }
        }

        Ok(DependencyGraph {
            nodes: by_target,
            dependents,
        })
    }

    /// Resolves a reference path to the node whose target path equals
    /// or is the longest prefix of it (spec §4.8): `(( grab
    /// meta.owner.name ))` depends on a node targeting `meta.owner` even
    /// though it never targets `meta.owner.name` itself, since that node
    /// is the one that actually produces the value the reference reads
    /// through.
    fn resolve_dependency<'a>(nodes: &'a HashMap<Path, DependencyNode>, dep: &Path) -> Option<&'a Path> {
        nodes
            .keys()
            .filter(|target| target.contains_or_equals(dep))
            .max_by_key(|target| target.segments().len())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, path: &Path) -> Option<&DependencyNode> {
        self.nodes.get(path)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &DependencyNode> {
        self.nodes.values()
    }

    fn in_degree(&self, path: &Path) -> usize {
        self.nodes
            .get(path)
            .map(|n| {
                n.dependencies
                    .iter()
                    .filter(|d| Self::resolve_dependency(&self.nodes, d).is_some())
                    .count()
            })
            .unwrap_or(0)
    }

    /// Partitions the graph into waves via Kahn's algorithm: each wave
    /// holds every node whose remaining dependencies have all already
    /// been placed in an earlier wave, so nodes within a wave may run
    /// concurrently. Ties within a wave are broken by path ordering so
    /// wave contents are deterministic across runs.
    pub fn compute_waves(&self) -> Result<Vec<Wave>, ValidationError> {
        let mut remaining: HashMap<Path, usize> =
            self.nodes.keys().map(|p| (p.clone(), self.in_degree(p))).collect();
        let mut waves = Vec::new();
        let mut placed = 0usize;

        loop {
            let mut ready: Vec<Path> = remaining
                .iter()
                .filter(|(_, &deg)| deg == 0)
                .map(|(p, _)| p.clone())
                .collect();
            if ready.is_empty() {
                break;
            }
            ready.sort();
            for p in &ready {
                remaining.remove(p);
            }
            placed += ready.len();
            for p in &ready {
                if let Some(deps) = self.dependents.get(p) {
                    for dependent in deps {
                        if let Some(deg) = remaining.get_mut(dependent) {
                            *deg = deg.saturating_sub(1);
                        }
                    }
                }
            }
            waves.push(ready);
        }

        if placed != self.nodes.len() {
            let cycle = self.find_cycle(remaining.keys().cloned().collect());
            return Err(ValidationError::CyclicDependency { cycle });
        }

        Ok(waves)
    }

    /// Walk the unresolved subgraph to report one concrete cycle for
    /// the error message, rather than just the set of stuck nodes.
    fn find_cycle(&self, stuck: HashSet<Path>) -> Vec<String> {
        let mut visited = HashSet::new();
        let mut stack = Vec::new();

        let Some(start) = stuck.iter().next().cloned() else {
            return Vec::new();
        };

        let mut current = start.clone();
        loop {
            if !visited.insert(current.clone()) {
                let pos = stack.iter().position(|p| *p == current).unwrap_or(0);
                return stack[pos..]
                    .iter()
                    .map(Path::to_string)
                    .chain(std::iter::once(current.to_string()))
                    .collect();
            }
            stack.push(current.clone());
            let Some(node) = self.nodes.get(&current) else { break };
            let next = node.dependencies.iter().find_map(|d| {
                let target = Self::resolve_dependency(&self.nodes, d)?;
                stuck.contains(target).then(|| target.clone())
            });
            match next {
                Some(next) => current = next,
                None => break,
            }
        }
        stack.iter().map(Path::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(target: &str, deps_expr: &str) -> DependencyNode {
        let expr = OperatorExpression::parse(deps_expr).unwrap();
        DependencyNode::new(Path::parse(target).unwrap(), expr)
    }

    #[test]
    fn linear_chain_produces_one_node_per_wave() {
        let graph = DependencyGraph::build(vec![
            node("a", "(( grab seed ))"),
            node("b", "(( grab a ))"),
            node("c", "(( grab b ))"),
        ])
        .unwrap();
        let waves = graph.compute_waves().unwrap();
        assert_eq!(waves.len(), 3);
        assert_eq!(waves[0], vec![Path::parse("a").unwrap()]);
        assert_eq!(waves[1], vec![Path::parse("b").unwrap()]);
        assert_eq!(waves[2], vec![Path::parse("c").unwrap()]);
    }

    #[test]
    fn diamond_dependency_converges_in_final_wave() {
        let graph = DependencyGraph::build(vec![
            node("a", "(( grab seed ))"),
            node("b", "(( grab a ))"),
            node("c", "(( grab a ))"),
            node("d", "(( concat b c ))"),
        ])
        .unwrap();
        let waves = graph.compute_waves().unwrap();
        assert_eq!(waves.len(), 3);
        assert_eq!(waves[1].len(), 2);
        assert_eq!(waves[2], vec![Path::parse("d").unwrap()]);
    }

    #[test]
    fn cycle_is_detected() {
        let graph = DependencyGraph::build(vec![node("a", "(( grab b ))"), node("b", "(( grab a ))")]).unwrap();
        let err = graph.compute_waves().unwrap_err();
        assert!(matches!(err, ValidationError::CyclicDependency { .. }));
    }

    #[test]
    fn reference_under_another_nodes_target_prefix_creates_a_dependency_edge() {
        let graph = DependencyGraph::build(vec![
            node("meta.owner", "(( grab seed ))"),
            node("summary", "(( grab meta.owner.name ))"),
        ])
        .unwrap();
        let waves = graph.compute_waves().unwrap();
        assert_eq!(waves.len(), 2);
        assert_eq!(waves[0], vec![Path::parse("meta.owner").unwrap()]);
        assert_eq!(waves[1], vec![Path::parse("summary").unwrap()]);
    }

    #[test]
    fn duplicate_target_is_rejected() {
        let err = DependencyGraph::build(vec![node("a", "(( grab x ))"), node("a", "(( grab y ))")]).unwrap_err();
        assert!(matches!(err, ValidationError::DuplicateNodeId { .. }));
    }
}
