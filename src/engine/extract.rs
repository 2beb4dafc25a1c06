// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::EngineError;
use crate::graph::{DependencyNode, OperatorExpression};
use crate::tree::{Path, Value};

/// Walks a parsed document and collects one `DependencyNode` per
/// string leaf that is an operator expression, with its path in the
/// document as the node's target.
pub fn extract_nodes(root: &Value) -> Result<Vec<DependencyNode>, EngineError> {
    let mut nodes = Vec::new();
    walk(root, &mut Vec::new(), &mut nodes)?;
    Ok(nodes)
}

fn walk(value: &Value, prefix: &mut Vec<String>, out: &mut Vec<DependencyNode>) -> Result<(), EngineError> {
    match value {
        Value::String(s) if crate::graph::expression::looks_like_expression(s) => {
            let target = Path::parse(&prefix.join(".")).map_err(|e| EngineError::Parse {
                path: prefix.join("."),
                reason: e.to_string(),
            })?;
            let expression = OperatorExpression::parse(s).map_err(|e| EngineError::Parse {
                path: target.to_string(),
                reason: e.to_string(),
            })?;
            out.push(DependencyNode::new(target, expression));
            Ok(())
        }
        Value::Map(map) => {
            for (k, v) in map {
                prefix.push(k.clone());
                walk(v, prefix, out)?;
                prefix.pop();
            }
            Ok(())
        }
        Value::Sequence(seq) => {
            for (i, v) in seq.iter().enumerate() {
                prefix.push(i.to_string());
                walk(v, prefix, out)?;
                prefix.pop();
            }
            Ok(())
        }
        _ => Ok(()),
    }
}
