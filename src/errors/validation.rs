// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Errors surfaced while validating a parsed dependency graph, before any
/// operator runs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("cyclic dependency detected: {}", .cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    #[error("node '{node_id}' depends on '{missing_dependency}' which does not exist")]
    UnresolvedDependency {
        node_id: String,
        missing_dependency: String,
    },

    #[error("duplicate node id: '{node_id}'")]
    DuplicateNodeId { node_id: String },
}
