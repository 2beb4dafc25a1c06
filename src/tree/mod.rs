// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Thread-safe tree substrate: a path-addressed document store that
//! operators read from and write into during evaluation.

mod nav;
mod shard_lock;
mod sharded;
mod simple;
mod transaction;
mod value;

pub use shard_lock::ShardedLockManager;
pub use sharded::ShardedTree;
pub use simple::SimpleTree;
pub use transaction::{Op, Transaction};
pub use value::{Path, PathError, Value};

/// Uniform access contract for the document store. `SimpleTree` and
/// `ShardedTree` both implement it; callers pick one at construction
/// time based on expected concurrency (see spec §4.1 / §4.2).
pub trait TreeStore: Send + Sync {
    fn find(&self, path: &Path) -> Result<Value, PathError>;
    fn exists(&self, path: &Path) -> bool;
    fn set(&self, path: &Path, value: Value) -> Result<(), PathError>;
    fn delete(&self, path: &Path) -> Result<(), PathError>;
    fn replace(&self, path: &Path, value: Value) -> Result<Value, PathError>;
    fn merge(&self, path: &Path, value: Value) -> Result<(), PathError>;

    /// Atomically set `path` to `new` only if its current value equals
    /// `expected`; returns false without writing on mismatch.
    fn compare_and_swap(&self, path: &Path, expected: &Value, new: Value) -> Result<bool, PathError>;

    fn update<F>(&self, path: &Path, f: F) -> Result<(), PathError>
    where
        F: FnOnce(Option<&Value>) -> Value;

    fn transaction(&self) -> Transaction<'_>;

    /// Apply every op in `ops` as a single atomic unit: acquire whatever
    /// locks are needed up front (ascending shard order, where the store
    /// shards), apply them in order, and roll back to the pre-commit
    /// state on the first failure rather than leaving a partial write.
    fn commit_transaction(&self, ops: Vec<Op>) -> Result<(), PathError>;

    /// Copies the subtree at `from` to `to` *within this same store*.
    /// Not an independent snapshot — see `snapshot()` for that.
    fn copy_subtree(&self, from: &Path, to: &Path) -> Result<(), PathError> {
        let value = self.find(from)?;
        self.set(to, value)
    }

    /// Builds a new, independent store seeded from this one's current
    /// root. Mutations on the returned store never affect `self` and
    /// vice versa (spec §4.1 `Copy() -> tree`, §8's isolation invariant).
    fn snapshot(&self) -> Box<dyn TreeStore>;

    fn root(&self) -> Value;
}
