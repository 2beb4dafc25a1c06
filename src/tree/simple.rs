// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use parking_lot::RwLock;

use super::nav;
use super::transaction::{Op, Transaction};
use super::value::{Path, PathError, Value};
use super::TreeStore;

/// A document store backed by a single reader/writer lock over the
/// whole root. Appropriate for small documents or single-threaded
/// evaluation where the sharded manager's bookkeeping isn't worth it.
pub struct SimpleTree {
    root: RwLock<Value>,
}

impl SimpleTree {
    pub fn new(root: Value) -> Self {
        SimpleTree { root: RwLock::new(root) }
    }
}

impl Default for SimpleTree {
    fn default() -> Self {
        SimpleTree::new(Value::Map(Default::default()))
    }
}

impl TreeStore for SimpleTree {
    fn find(&self, path: &Path) -> Result<Value, PathError> {
        nav::find(&self.root.read(), path)
    }

    fn exists(&self, path: &Path) -> bool {
        nav::exists(&self.root.read(), path)
    }

    fn set(&self, path: &Path, value: Value) -> Result<(), PathError> {
        nav::set(&mut self.root.write(), path, value)
    }

    fn delete(&self, path: &Path) -> Result<(), PathError> {
        nav::delete(&mut self.root.write(), path)
    }

    fn replace(&self, path: &Path, value: Value) -> Result<Value, PathError> {
        nav::replace(&mut self.root.write(), path, value)
    }

    fn merge(&self, path: &Path, value: Value) -> Result<(), PathError> {
        nav::merge(&mut self.root.write(), path, value)
    }

    fn compare_and_swap(&self, path: &Path, expected: &Value, new: Value) -> Result<bool, PathError> {
        let mut root = self.root.write();
        let current = nav::find(&root, path)?;
        if &current != expected {
            return Ok(false);
        }
        nav::set(&mut root, path, new)?;
        Ok(true)
    }

    fn update<F>(&self, path: &Path, f: F) -> Result<(), PathError>
    where
        F: FnOnce(Option<&Value>) -> Value,
    {
        let mut root = self.root.write();
        let current = nav::find(&root, path).ok();
        let next = f(current.as_ref());
        nav::set(&mut root, path, next)
    }

    fn transaction(&self) -> Transaction<'_> {
        Transaction::new(self)
    }

    fn commit_transaction(&self, ops: Vec<Op>) -> Result<(), PathError> {
        let mut root = self.root.write();
        let snapshot = root.clone();
        for op in ops {
            let result = match op {
                Op::Set(path, value) => nav::set(&mut root, &path, value),
                Op::Delete(path) => nav::delete(&mut root, &path),
                Op::Merge(path, value) => nav::merge(&mut root, &path, value),
            };
            if let Err(e) = result {
                *root = snapshot;
                return Err(e);
            }
        }
        Ok(())
    }

    fn snapshot(&self) -> Box<dyn TreeStore> {
        Box::new(SimpleTree::new(self.root()))
    }

    fn root(&self) -> Value {
        self.root.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_find_round_trips() {
        let tree = SimpleTree::default();
        let path = Path::parse("meta.owner").unwrap();
        tree.set(&path, Value::String("alice".into())).unwrap();
        assert_eq!(tree.find(&path).unwrap(), Value::String("alice".into()));
    }

    #[test]
    fn compare_and_swap_rejects_stale_expectation() {
        let tree = SimpleTree::default();
        let path = Path::parse("count").unwrap();
        tree.set(&path, Value::Int(1)).unwrap();
        let ok = tree
            .compare_and_swap(&path, &Value::Int(99), Value::Int(2))
            .unwrap();
        assert!(!ok);
        assert_eq!(tree.find(&path).unwrap(), Value::Int(1));

        let ok = tree
            .compare_and_swap(&path, &Value::Int(1), Value::Int(2))
            .unwrap();
        assert!(ok);
        assert_eq!(tree.find(&path).unwrap(), Value::Int(2));
    }

    #[test]
    fn snapshot_is_isolated_from_the_original() {
        let tree = SimpleTree::default();
        let path = Path::parse("meta.owner").unwrap();
        tree.set(&path, Value::String("alice".into())).unwrap();

        let copy = tree.snapshot();
        tree.set(&path, Value::String("bob".into())).unwrap();
        copy.set(&Path::parse("meta.extra").unwrap(), Value::Int(1)).unwrap();

        assert_eq!(tree.find(&path).unwrap(), Value::String("bob".into()));
        assert_eq!(copy.find(&path).unwrap(), Value::String("alice".into()));
        assert!(!tree.exists(&Path::parse("meta.extra").unwrap()));
    }
}
