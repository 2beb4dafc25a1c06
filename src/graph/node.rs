// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::tree::Path;

use super::expression::OperatorExpression;

/// One `(( op args ))` site in the document: the path it will write
/// its result to, the parsed expression, and the paths it reads from
/// (collected from `Arg::Reference` and recursively from nested
/// expressions).
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyNode {
    pub target: Path,
    pub expression: OperatorExpression,
    pub dependencies: Vec<Path>,
}

impl DependencyNode {
    pub fn new(target: Path, expression: OperatorExpression) -> Self {
        let mut dependencies = Vec::new();
        collect_references(&expression, &mut dependencies);
        DependencyNode {
            target,
            expression,
            dependencies,
        }
    }
}

fn collect_references(expr: &OperatorExpression, out: &mut Vec<Path>) {
    use super::expression::Arg;
    for arg in &expr.args {
        match arg {
            Arg::Reference(p) => out.push(p.clone()),
            Arg::Nested(nested) => collect_references(nested, out),
            Arg::Literal(_) => {}
        }
    }
}

/// One batch of nodes whose dependencies are all already satisfied,
/// and which therefore may be evaluated concurrently.
pub type Wave = Vec<Path>;
