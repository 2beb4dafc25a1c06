// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use super::nav;
use super::shard_lock::ShardedLockManager;
use super::transaction::{Op, Transaction};
use super::value::{Path, PathError, Value};
use super::TreeStore;

/// Default number of shards a `ShardedTree` partitions its top-level
/// keys across, matching the sharded lock manager's default fan-out.
pub const DEFAULT_SHARD_COUNT: usize = 32;

/// A document store that spreads top-level keys across independently
/// locked shards, so writes under unrelated top-level keys never
/// contend. Appropriate for evaluating wide documents with many
/// parallel waves.
pub struct ShardedTree {
    locks: ShardedLockManager,
    /// `TryLock` bound used by `commit_transaction` when acquiring more
    /// than one shard. `None` blocks indefinitely, matching the
    /// single-shard calls' behavior.
    lock_timeout: Option<Duration>,
}

impl ShardedTree {
    pub fn new(shard_count: usize) -> Self {
        ShardedTree {
            locks: ShardedLockManager::new(shard_count),
            lock_timeout: None,
        }
    }

    pub fn with_root(shard_count: usize, root: Value) -> Self {
        let tree = ShardedTree::new(shard_count);
        if let Value::Map(m) = root {
            for (k, v) in m {
                tree.locks.write_shard(&k).insert(k.clone(), v);
            }
        }
        tree
    }

    /// Bounds how long a multi-shard transaction waits for each shard
    /// it needs, per spec §4.2's `TryLock(path, exclusive, timeout)`.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }

    pub fn shard_count(&self) -> usize {
        self.locks.shard_count()
    }
}

impl Default for ShardedTree {
    fn default() -> Self {
        ShardedTree::new(DEFAULT_SHARD_COUNT)
    }
}

/// Applies `Op::Set` directly against an already-locked shard map,
/// shared by the single-op trait methods and `commit_transaction` so
/// neither duplicates the other's traversal logic.
fn apply_set(shard: &mut HashMap<String, Value>, path: &Path, value: Value) -> Result<(), PathError> {
    match path.tail() {
        None => {
            shard.insert(path.first().to_string(), value);
            Ok(())
        }
        Some(tail) => {
            let top = shard.entry(path.first().to_string()).or_insert(Value::Null);
            nav::set(top, &tail, value)
        }
    }
}

fn apply_delete(shard: &mut HashMap<String, Value>, path: &Path) -> Result<(), PathError> {
    match path.tail() {
        None => {
            shard.remove(path.first()).ok_or_else(|| PathError::NotFound(path.to_string()))?;
            Ok(())
        }
        Some(tail) => {
            let top = shard.get_mut(path.first()).ok_or_else(|| PathError::NotFound(path.to_string()))?;
            nav::delete(top, &tail)
        }
    }
}

fn apply_merge(shard: &mut HashMap<String, Value>, path: &Path, value: Value) -> Result<(), PathError> {
    let top = shard.entry(path.first().to_string()).or_insert(Value::Null);
    match path.tail() {
        None => {
            top.merge(value);
            Ok(())
        }
        Some(tail) => nav::merge(top, &tail, value),
    }
}

impl TreeStore for ShardedTree {
    fn find(&self, path: &Path) -> Result<Value, PathError> {
        if path.is_root() {
            return Ok(self.root());
        }
        let shard = self.locks.read_shard(path.first());
        let top = shard.get(path.first()).ok_or_else(|| PathError::NotFound(path.to_string()))?;
        match path.tail() {
            Some(tail) => nav::find(top, &tail),
            None => Ok(top.clone()),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.find(path).is_ok()
    }

    fn set(&self, path: &Path, value: Value) -> Result<(), PathError> {
        if path.is_root() {
            return Err(PathError::InvalidPath);
        }
        let mut shard = self.locks.write_shard(path.first());
        apply_set(&mut shard, path, value)
    }

    fn delete(&self, path: &Path) -> Result<(), PathError> {
        if path.is_root() {
            return Err(PathError::InvalidPath);
        }
        let mut shard = self.locks.write_shard(path.first());
        apply_delete(&mut shard, path)
    }

    fn replace(&self, path: &Path, value: Value) -> Result<Value, PathError> {
        let previous = self.find(path)?;
        self.set(path, value)?;
        Ok(previous)
    }

    fn merge(&self, path: &Path, value: Value) -> Result<(), PathError> {
        if path.is_root() {
            let Value::Map(incoming) = value else {
                return Err(PathError::InvalidPath);
            };
            for (k, v) in incoming {
                let mut shard = self.locks.write_shard(&k);
                let entry = shard.entry(k.clone()).or_insert(Value::Null);
                entry.merge(v);
            }
            return Ok(());
        }
        let mut shard = self.locks.write_shard(path.first());
        apply_merge(&mut shard, path, value)
    }

    fn compare_and_swap(&self, path: &Path, expected: &Value, new: Value) -> Result<bool, PathError> {
        if path.is_root() {
            return Err(PathError::InvalidPath);
        }
        let mut shard = self.locks.write_shard(path.first());
        match path.tail() {
            None => {
                let current = shard.get(path.first());
                if current != Some(expected) {
                    return Ok(false);
                }
                shard.insert(path.first().to_string(), new);
                Ok(true)
            }
            Some(tail) => {
                let top = shard.entry(path.first().to_string()).or_insert(Value::Null);
                let current = nav::find(top, &tail)?;
                if &current != expected {
                    return Ok(false);
                }
                nav::set(top, &tail, new)?;
                Ok(true)
            }
        }
    }

    fn update<F>(&self, path: &Path, f: F) -> Result<(), PathError>
    where
        F: FnOnce(Option<&Value>) -> Value,
    {
        if path.is_root() {
            return Err(PathError::InvalidPath);
        }
        let mut shard = self.locks.write_shard(path.first());
        match path.tail() {
            None => {
                let current = shard.get(path.first());
                let next = f(current);
                shard.insert(path.first().to_string(), next);
                Ok(())
            }
            Some(tail) => {
                let top = shard.entry(path.first().to_string()).or_insert(Value::Null);
                let current = nav::find(top, &tail).ok();
                let next = f(current.as_ref());
                nav::set(top, &tail, next)
            }
        }
    }

    fn transaction(&self) -> Transaction<'_> {
        Transaction::new(self)
    }

    /// Acquires every shard the transaction touches in ascending index
    /// order (deadlock avoidance against concurrent single-op writers
    /// and other transactions), snapshots them, applies every op, and
    /// restores the snapshots on the first failure — including a
    /// `LockTimeout` while still acquiring the shard set.
    fn commit_transaction(&self, ops: Vec<Op>) -> Result<(), PathError> {
        if ops.is_empty() {
            return Ok(());
        }

        let mut touched: BTreeMap<usize, String> = BTreeMap::new();
        for op in &ops {
            let path = op.target();
            if path.is_root() {
                return Err(PathError::InvalidPath);
            }
            let idx = self.locks.shard_index(path.first());
            touched.entry(idx).or_insert_with(|| path.first().to_string());
        }

        let mut guards = Vec::with_capacity(touched.len());
        for (&idx, key) in &touched {
            let guard = match self.lock_timeout {
                Some(timeout) => {
                    self.locks
                        .try_write_shard_by_index(idx, timeout)
                        .ok_or_else(|| PathError::LockTimeout {
                            path: key.clone(),
                            timeout_ms: timeout.as_millis() as u64,
                        })?
                }
                None => self.locks.write_shard_by_index(idx),
            };
            guards.push((idx, guard));
        }

        let snapshots: Vec<(usize, HashMap<String, Value>)> =
            guards.iter().map(|(idx, guard)| (*idx, (**guard).clone())).collect();

        for op in ops {
            let idx = self.locks.shard_index(op.target().first());
            let pos = guards.iter().position(|(i, _)| *i == idx).expect("shard was pre-locked");
            let shard: &mut HashMap<String, Value> = &mut guards[pos].1;
            let result = match op {
                Op::Set(path, value) => apply_set(shard, &path, value),
                Op::Delete(path) => apply_delete(shard, &path),
                Op::Merge(path, value) => apply_merge(shard, &path, value),
            };
            if let Err(e) = result {
                for (idx, snap) in snapshots {
                    let pos = guards.iter().position(|(i, _)| *i == idx).expect("shard was pre-locked");
                    *guards[pos].1 = snap;
                }
                return Err(e);
            }
        }
        Ok(())
    }

    fn snapshot(&self) -> Box<dyn TreeStore> {
        Box::new(ShardedTree::with_root(self.shard_count(), self.root()))
    }

    fn root(&self) -> Value {
        let shards = self.locks.read_all();
        let mut merged = HashMap::new();
        for shard in shards {
            for (k, v) in shard.iter() {
                merged.insert(k.clone(), v.clone());
            }
        }
        Value::Map(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_find_round_trips_through_shards() {
        let tree = ShardedTree::new(8);
        let path = Path::parse("meta.owner").unwrap();
        tree.set(&path, Value::String("alice".into())).unwrap();
        assert_eq!(tree.find(&path).unwrap(), Value::String("alice".into()));
    }

    #[test]
    fn unrelated_top_level_keys_land_in_independent_shards_or_share_safely() {
        let tree = ShardedTree::new(4);
        tree.set(&Path::parse("a").unwrap(), Value::Int(1)).unwrap();
        tree.set(&Path::parse("b").unwrap(), Value::Int(2)).unwrap();
        assert_eq!(tree.find(&Path::parse("a").unwrap()).unwrap(), Value::Int(1));
        assert_eq!(tree.find(&Path::parse("b").unwrap()).unwrap(), Value::Int(2));
    }

    #[test]
    fn root_snapshot_merges_all_shards() {
        let tree = ShardedTree::new(4);
        tree.set(&Path::parse("a").unwrap(), Value::Int(1)).unwrap();
        tree.set(&Path::parse("b").unwrap(), Value::Int(2)).unwrap();
        let root = tree.root();
        let map = root.as_map().unwrap();
        assert_eq!(map.get("a"), Some(&Value::Int(1)));
        assert_eq!(map.get("b"), Some(&Value::Int(2)));
    }

    #[test]
    fn compare_and_swap_rejects_stale_expectation() {
        let tree = ShardedTree::new(4);
        let path = Path::parse("count").unwrap();
        tree.set(&path, Value::Int(1)).unwrap();
        assert!(!tree.compare_and_swap(&path, &Value::Int(99), Value::Int(2)).unwrap());
        assert!(tree.compare_and_swap(&path, &Value::Int(1), Value::Int(2)).unwrap());
        assert_eq!(tree.find(&path).unwrap(), Value::Int(2));
    }

    #[test]
    fn snapshot_is_isolated_from_the_original() {
        let tree = ShardedTree::new(4);
        tree.set(&Path::parse("a").unwrap(), Value::Int(1)).unwrap();

        let copy = tree.snapshot();
        tree.set(&Path::parse("a").unwrap(), Value::Int(2)).unwrap();
        copy.set(&Path::parse("b").unwrap(), Value::Int(99)).unwrap();

        assert_eq!(tree.find(&Path::parse("a").unwrap()).unwrap(), Value::Int(2));
        assert_eq!(copy.find(&Path::parse("a").unwrap()).unwrap(), Value::Int(1));
        assert!(!tree.exists(&Path::parse("b").unwrap()));
    }

    #[test]
    fn multi_shard_transaction_commits_atomically() {
        let tree = ShardedTree::new(8);
        let mut txn = tree.transaction();
        txn.set(Path::parse("a").unwrap(), Value::Int(1));
        txn.set(Path::parse("b").unwrap(), Value::Int(2));
        txn.set(Path::parse("c").unwrap(), Value::Int(3));
        txn.commit().unwrap();

        assert_eq!(tree.find(&Path::parse("a").unwrap()).unwrap(), Value::Int(1));
        assert_eq!(tree.find(&Path::parse("b").unwrap()).unwrap(), Value::Int(2));
        assert_eq!(tree.find(&Path::parse("c").unwrap()).unwrap(), Value::Int(3));
    }

    #[test]
    fn multi_shard_transaction_rolls_back_every_touched_shard_on_failure() {
        let tree = ShardedTree::new(8);
        tree.set(&Path::parse("a").unwrap(), Value::Int(1)).unwrap();

        let mut txn = tree.transaction();
        txn.set(Path::parse("a").unwrap(), Value::Int(2));
        txn.set(Path::parse("b").unwrap(), Value::Int(2));
        txn.delete(Path::parse("missing").unwrap());
        let err = txn.commit().unwrap_err();

        assert!(matches!(err, PathError::NotFound(_)));
        assert_eq!(tree.find(&Path::parse("a").unwrap()).unwrap(), Value::Int(1));
        assert!(!tree.exists(&Path::parse("b").unwrap()));
    }

    #[test]
    fn transaction_times_out_when_a_touched_shard_is_already_held() {
        let tree = ShardedTree::new(4).with_lock_timeout(Duration::from_millis(20));
        let idx = tree.locks.shard_index("a");
        let _held = tree.locks.write_shard_by_index(idx);

        let mut txn = tree.transaction();
        txn.set(Path::parse("a").unwrap(), Value::Int(1));
        let err = txn.commit().unwrap_err();
        assert!(matches!(err, PathError::LockTimeout { .. }));
    }
}
