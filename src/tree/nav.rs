// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;

use super::value::{Path, PathError, Value};

fn kind_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Int(_) => "int",
        Value::Float(_) => "float",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Map(_) => "map",
    }
}

fn step<'a>(current: &'a Value, segment: &str, path: &Path) -> Result<&'a Value, PathError> {
    match current {
        Value::Map(m) => m.get(segment).ok_or_else(|| PathError::NotFound(path.to_string())),
        Value::Sequence(s) => {
            let idx: usize = segment
                .parse()
                .map_err(|_| PathError::NotFound(path.to_string()))?;
            s.get(idx).ok_or_else(|| PathError::NotFound(path.to_string()))
        }
        other => Err(PathError::PathTraversal {
            path: path.to_string(),
            kind: kind_name(other),
        }),
    }
}

pub fn find(root: &Value, path: &Path) -> Result<Value, PathError> {
    if path.is_root() {
        return Ok(root.clone());
    }
    let mut current = root;
    for segment in path.segments() {
        current = step(current, segment, path)?;
    }
    Ok(current.clone())
}

pub fn exists(root: &Value, path: &Path) -> bool {
    find(root, path).is_ok()
}

/// Navigate to the parent container of `path`'s final segment,
/// creating intermediate maps as needed, and return a mutable
/// reference to it along with the final segment.
fn navigate_to_parent_mut<'a>(root: &'a mut Value, path: &Path) -> Result<(&'a mut Value, &'a str), PathError> {
    let segments = path.segments();
    let (last, parents) = segments.split_last().expect("non-root path has at least one segment");
    let mut current = root;
    for segment in parents {
        if !matches!(current, Value::Map(_)) {
            if matches!(current, Value::Null) {
                *current = Value::Map(HashMap::new());
            } else {
                return Err(PathError::PathTraversal {
                    path: path.to_string(),
                    kind: kind_name(current),
                });
            }
        }
        let Value::Map(m) = current else { unreachable!() };
        current = m.entry(segment.clone()).or_insert(Value::Null);
    }
    Ok((current, last.as_str()))
}

pub fn set(root: &mut Value, path: &Path, value: Value) -> Result<(), PathError> {
    if path.is_root() {
        *root = value;
        return Ok(());
    }
    let (parent, last) = navigate_to_parent_mut(root, path)?;
    match parent {
        Value::Map(m) => {
            m.insert(last.to_string(), value);
            Ok(())
        }
        Value::Null => {
            let mut m = HashMap::new();
            m.insert(last.to_string(), value);
            *parent = Value::Map(m);
            Ok(())
        }
        Value::Sequence(s) => {
            let idx: usize = last
                .parse()
                .map_err(|_| PathError::NotFound(path.to_string()))?;
            if idx >= s.len() {
                return Err(PathError::NotFound(path.to_string()));
            }
            s[idx] = value;
            Ok(())
        }
        other => Err(PathError::PathTraversal {
            path: path.to_string(),
            kind: kind_name(other),
        }),
    }
}

pub fn delete(root: &mut Value, path: &Path) -> Result<(), PathError> {
    if path.is_root() {
        *root = Value::Null;
        return Ok(());
    }
    let (parent, last) = navigate_to_parent_mut(root, path)?;
    match parent {
        Value::Map(m) => {
            m.remove(last).ok_or_else(|| PathError::NotFound(path.to_string()))?;
            Ok(())
        }
        Value::Sequence(s) => {
            let idx: usize = last
                .parse()
                .map_err(|_| PathError::NotFound(path.to_string()))?;
            if idx >= s.len() {
                return Err(PathError::NotFound(path.to_string()));
            }
            s.remove(idx);
            Ok(())
        }
        other => Err(PathError::PathTraversal {
            path: path.to_string(),
            kind: kind_name(other),
        }),
    }
}

pub fn replace(root: &mut Value, path: &Path, value: Value) -> Result<Value, PathError> {
    let previous = find(root, path)?;
    set(root, path, value)?;
    Ok(previous)
}

pub fn merge(root: &mut Value, path: &Path, value: Value) -> Result<(), PathError> {
    if path.is_root() {
        root.merge(value);
        return Ok(());
    }
    let (parent, last) = navigate_to_parent_mut(root, path)?;
    if matches!(parent, Value::Null) {
        *parent = Value::Map(HashMap::new());
    }
    match parent {
        Value::Map(m) => {
            let entry = m.entry(last.to_string()).or_insert(Value::Null);
            entry.merge(value);
            Ok(())
        }
        other => Err(PathError::PathTraversal {
            path: path.to_string(),
            kind: kind_name(other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Value {
        Value::Map(HashMap::from([(
            "meta".to_string(),
            Value::Map(HashMap::from([("owner".to_string(), Value::String("alice".into()))])),
        )]))
    }

    #[test]
    fn find_traverses_nested_maps() {
        let root = doc();
        let v = find(&root, &Path::parse("meta.owner").unwrap()).unwrap();
        assert_eq!(v, Value::String("alice".into()));
    }

    #[test]
    fn find_missing_path_is_not_found() {
        let root = doc();
        let err = find(&root, &Path::parse("meta.missing").unwrap()).unwrap_err();
        assert!(matches!(err, PathError::NotFound(_)));
    }

    #[test]
    fn find_through_scalar_is_path_traversal() {
        let root = doc();
        let err = find(&root, &Path::parse("meta.owner.nested").unwrap()).unwrap_err();
        assert!(matches!(err, PathError::PathTraversal { .. }));
    }

    #[test]
    fn set_creates_intermediate_maps() {
        let mut root = Value::Null;
        set(&mut root, &Path::parse("a.b.c").unwrap(), Value::Int(7)).unwrap();
        assert_eq!(find(&root, &Path::parse("a.b.c").unwrap()).unwrap(), Value::Int(7));
    }

    #[test]
    fn delete_removes_key() {
        let mut root = doc();
        delete(&mut root, &Path::parse("meta.owner").unwrap()).unwrap();
        assert!(!exists(&root, &Path::parse("meta.owner").unwrap()));
    }
}
