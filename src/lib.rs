// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! graftwood: a concurrent graph-rewrite evaluation engine for
//! YAML/JSON documents with embedded `(( operator args ))` expressions.
//!
//! Parse a document, build its dependency graph from the operator
//! expressions it contains, plan it into cost-ranked waves, and
//! evaluate those waves concurrently against a shared tree store —
//! see [`Engine`] for the entry point.

pub mod cache;
pub mod config;
pub mod cost;
pub mod dedup;
pub mod engine;
pub mod errors;
pub mod evaluator;
pub mod graph;
pub mod metrics;
pub mod observability;
pub mod operator;
pub mod planner;
pub mod pool;
pub mod tree;
pub mod worker;

pub use engine::Engine;
pub use errors::{EngineError, EvaluationReport, FailureStrategy};
pub use tree::{Path, Value};
