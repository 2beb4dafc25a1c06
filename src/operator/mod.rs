// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The operator execution contract: every `(( op args ))` site is
//! dispatched through an `Operator` implementation, optionally wrapped
//! in the thread-safe adapter that adds fingerprinting, caching, and
//! request coalescing around operators that aren't safe to call
//! concurrently on shared state.

pub mod adapter;
pub mod builtin;
pub mod classify;
mod registry;

use async_trait::async_trait;

use crate::cache::CacheTier;
use crate::dedup::Deduplicator;
use crate::errors::EngineError;
use crate::graph::Arg;
use crate::tree::{Path, TreeStore};

pub use registry::OperatorRegistry;

/// Everything an operator needs to resolve its arguments and produce a
/// result: the document it's reading from, and the shared subsystems
/// (cache, dedup) the thread-safe adapter drives on its behalf.
pub struct OperatorContext<'a> {
    pub tree: &'a dyn TreeStore,
    pub cache: Option<&'a CacheTier>,
    pub dedup: Option<&'a Deduplicator>,
    pub node: &'a Path,
}

impl<'a> OperatorContext<'a> {
    pub fn new(tree: &'a dyn TreeStore, node: &'a Path) -> Self {
        OperatorContext {
            tree,
            cache: None,
            dedup: None,
            node,
        }
    }

    pub fn with_cache(mut self, cache: &'a CacheTier) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_dedup(mut self, dedup: &'a Deduplicator) -> Self {
        self.dedup = Some(dedup);
        self
    }

    pub fn resolve(&self, arg: &Arg) -> Result<crate::tree::Value, EngineError> {
        match arg {
            Arg::Literal(v) => Ok(v.clone()),
            Arg::Reference(path) => self.tree.find(path).map_err(|e| EngineError::Reference {
                path: self.node.to_string(),
                operator: "".to_string(),
                reference: format!("{path}: {e}"),
            }),
            Arg::Nested(_) => Err(EngineError::internal(
                "nested expression reached resolve() — should have been pre-evaluated",
            )),
        }
    }
}

/// Declares whether an operator's `run` may be invoked concurrently on
/// shared state (`ThreadSafe`) or must be serialized by the thread-safe
/// adapter (`ExclusiveAccess`) — mirrors the teacher's distinction
/// between in-process and out-of-process processor backends, here
/// applied to whether an operator's side effects (filesystem, network)
/// tolerate concurrent use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Concurrency {
    ThreadSafe,
    ExclusiveAccess,
}

/// The uniform operator execution contract every builtin (and any
/// future external) operator implements.
#[async_trait]
pub trait Operator: Send + Sync {
    /// The name this operator is registered under, e.g. `"grab"`.
    fn name(&self) -> &'static str;

    /// Whether this operator's `run` is safe to call from multiple
    /// waves' worker tasks at once.
    fn concurrency(&self) -> Concurrency {
        Concurrency::ThreadSafe
    }

    /// Paths this operator call depends on, beyond the ones already
    /// discoverable as `Arg::Reference`s (most operators need none).
    fn extra_dependencies(&self, _args: &[Arg]) -> Vec<Path> {
        Vec::new()
    }

    /// One-time setup before the first `run` (e.g. validating config).
    /// Default is a no-op.
    async fn setup(&self) -> Result<(), EngineError> {
        Ok(())
    }

    async fn run(&self, ctx: &OperatorContext<'_>, args: &[Arg]) -> Result<crate::tree::Value, EngineError>;
}
