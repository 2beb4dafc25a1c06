// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A tree value: a scalar, an ordered sequence, or a nested unordered map.
///
/// This is the crate's in-memory representation of a parsed YAML/JSON
/// document. Conversion to/from `serde_yaml::Value`/`serde_json::Value`
/// happens at the parse boundary (`from_yaml`/`to_yaml`, `from_json`/
/// `to_json`) — the YAML/JSON libraries themselves stay external
/// collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Sequence(Vec<Value>),
    Map(HashMap<String, Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Sequence(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_operator_expression(&self) -> bool {
        matches!(self, Value::String(s) if crate::graph::expression::looks_like_expression(s))
    }

    /// Merge `other` into `self` in place: scalars and sequences are
    /// replaced wholesale by `other`'s value at that path; maps merge
    /// key-wise, recursing, with `other`'s leaves winning at collisions.
    /// See DESIGN.md "Document merge policy".
    pub fn merge(&mut self, other: Value) {
        match (self, other) {
            (Value::Map(dst), Value::Map(src)) => {
                for (k, v) in src {
                    match dst.get_mut(&k) {
                        Some(existing) if matches!((&existing, &v), (Value::Map(_), Value::Map(_))) => {
                            existing.merge(v);
                        }
                        _ => {
                            dst.insert(k, v);
                        }
                    }
                }
            }
            (dst, src) => *dst = src,
        }
    }

    pub fn from_yaml(v: serde_yaml::Value) -> Result<Value, serde_yaml::Error> {
        serde_yaml::from_value(v)
    }

    pub fn to_yaml(&self) -> Result<serde_yaml::Value, serde_yaml::Error> {
        serde_yaml::to_value(self)
    }

    pub fn from_json(v: serde_json::Value) -> Result<Value, serde_json::Error> {
        serde_json::from_value(v)
    }

    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Sequence(_) => write!(f, "<sequence>"),
            Value::Map(_) => write!(f, "<map>"),
        }
    }
}

/// A dot-separated path of keys and numeric sequence indices, e.g.
/// `meta.tags.0.name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path(Vec<String>);

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PathError {
    #[error("path is empty")]
    InvalidPath,
    #[error("path '{0}' not found")]
    NotFound(String),
    #[error("path '{path}' traverses a {kind} as if it were a container")]
    PathTraversal { path: String, kind: &'static str },
    #[error("lock on path '{path}' timed out after {timeout_ms}ms")]
    LockTimeout { path: String, timeout_ms: u64 },
}

impl Path {
    pub fn parse(raw: &str) -> Result<Path, PathError> {
        if raw.is_empty() {
            return Err(PathError::InvalidPath);
        }
        Ok(Path(raw.split('.').map(|s| s.to_string()).collect()))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn parent(&self) -> Option<Path> {
        if self.0.len() <= 1 {
            None
        } else {
            Some(Path(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// True if `self` equals or is a strict prefix of `other` (used to
    /// detect write-conflicts between parallel-group target paths, and to
    /// decide whether a referenced path is "covered" by a node's target).
    pub fn contains_or_equals(&self, other: &Path) -> bool {
        self.0.len() <= other.0.len() && self.0 == other.0[..self.0.len()]
    }

    /// The path's first segment, i.e. the top-level key that owns it.
    pub fn first(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or("")
    }

    /// Everything after the first segment, or `None` if this path has
    /// only one segment.
    pub fn tail(&self) -> Option<Path> {
        if self.0.len() <= 1 {
            None
        } else {
            Some(Path(self.0[1..].to_vec()))
        }
    }

    pub fn join(&self, child: &str) -> Path {
        let mut segs = self.0.clone();
        segs.push(child.to_string());
        Path(segs)
    }

    pub fn as_dotted(&self) -> String {
        self.0.join(".")
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_dotted())
    }
}

impl From<&str> for Path {
    fn from(s: &str) -> Self {
        Path::parse(s).unwrap_or_else(|_| Path(vec![s.to_string()]))
    }
}
