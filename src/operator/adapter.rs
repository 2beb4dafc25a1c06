// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Wraps an `Operator` with the cross-cutting concerns every operator
//! gets for free: a fingerprint derived from its name and arguments,
//! a cache short-circuit keyed on that fingerprint, request dedup for
//! concurrent identical calls, and — for operators that declare
//! `Concurrency::ExclusiveAccess` — serialization through a per-operator
//! mutex so non-thread-safe backends never see concurrent `run` calls.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex as AsyncMutex;

use crate::cache::{CacheTier, HashAlgorithm, KeyGenerator, KeyKind};
use crate::dedup::Deduplicator;
use crate::errors::EngineError;
use crate::graph::Arg;
use crate::tree::{Path, Value};

use super::{Concurrency, Operator, OperatorContext};

pub struct ThreadSafeOperatorAdapter {
    inner: Arc<dyn Operator>,
    cache: Option<Arc<CacheTier>>,
    dedup: Option<Arc<Deduplicator>>,
    keygen: KeyGenerator,
    exclusive: AsyncMutex<()>,
}

impl ThreadSafeOperatorAdapter {
    pub fn new(inner: Arc<dyn Operator>) -> Self {
        ThreadSafeOperatorAdapter {
            inner,
            cache: None,
            dedup: None,
            keygen: KeyGenerator::new(KeyKind::OperatorCall, HashAlgorithm::Fnv32),
            exclusive: AsyncMutex::new(()),
        }
    }

    pub fn with_cache(mut self, cache: Arc<CacheTier>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_dedup(mut self, dedup: Arc<Deduplicator>) -> Self {
        self.dedup = Some(dedup);
        self
    }

    fn fingerprint(&self, args: &[Arg]) -> String {
        let source = format!("{}({:?})", self.inner.name(), args);
        self.keygen.generate(&source).unwrap_or(source)
    }

    async fn run_uncached(&self, ctx: &OperatorContext<'_>, args: &[Arg]) -> Result<Value, EngineError> {
        match self.inner.concurrency() {
            Concurrency::ThreadSafe => self.inner.run(ctx, args).await,
            Concurrency::ExclusiveAccess => {
                let _guard = self.exclusive.lock().await;
                self.inner.run(ctx, args).await
            }
        }
    }
}

#[async_trait]
impl Operator for ThreadSafeOperatorAdapter {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn concurrency(&self) -> Concurrency {
        // The adapter itself is always safe to call concurrently: the
        // exclusive-access case is serialized internally.
        Concurrency::ThreadSafe
    }

    fn extra_dependencies(&self, args: &[Arg]) -> Vec<Path> {
        self.inner.extra_dependencies(args)
    }

    async fn setup(&self) -> Result<(), EngineError> {
        self.inner.setup().await
    }

    async fn run(&self, ctx: &OperatorContext<'_>, args: &[Arg]) -> Result<Value, EngineError> {
        let key = self.fingerprint(args);

        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&key) {
                return Ok(hit);
            }
        }

        let result = if let Some(dedup) = &self.dedup {
            let args = args.to_vec();
            dedup
                .run(&key, || async move { self.run_uncached_boxed(ctx, &args).await })
                .await
        } else {
            self.run_uncached(ctx, args).await
        }?;

        if let Some(cache) = &self.cache {
            cache.put(key, result.clone());
        }

        Ok(result)
    }
}

impl ThreadSafeOperatorAdapter {
    /// `Deduplicator::run`'s closure must be `'static`-ish in spirit
    /// (it owns its captures), but `ctx` borrows the tree for the
    /// duration of one wave's dispatch, which outlives this call — so
    /// this just re-borrows through, rather than boxing anything
    /// heap-allocated.
    async fn run_uncached_boxed(&self, ctx: &OperatorContext<'_>, args: &[Arg]) -> Result<Value, EngineError> {
        self.run_uncached(ctx, args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::builtin::grab::Grab;
    use crate::tree::{Path as TreePath, SimpleTree, TreeStore};

    #[tokio::test]
    async fn cache_hit_short_circuits_inner_operator() {
        let tree = SimpleTree::default();
        tree.set(&TreePath::parse("a").unwrap(), Value::Int(1)).unwrap();
        let cache = Arc::new(CacheTier::new(Default::default()).unwrap());
        let adapter = ThreadSafeOperatorAdapter::new(Arc::new(Grab)).with_cache(cache.clone());

        let node = TreePath::parse("target").unwrap();
        let ctx = OperatorContext::new(&tree, &node);
        let args = vec![Arg::Reference(TreePath::parse("a").unwrap())];

        let first = adapter.run(&ctx, &args).await.unwrap();
        assert_eq!(first, Value::Int(1));

        tree.set(&TreePath::parse("a").unwrap(), Value::Int(999)).unwrap();
        let second = adapter.run(&ctx, &args).await.unwrap();
        assert_eq!(second, Value::Int(1), "second call should be served from cache, not re-read the tree");
    }
}
