// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::errors::EngineError;
use crate::graph::Arg;
use crate::operator::{Operator, OperatorContext};
use crate::tree::Value;

use super::concat::scalar_to_string;

/// `(( sort path.to.sequence ))` — sorts a sequence of scalars
/// lexicographically on their string representation.
pub struct Sort;

#[async_trait]
impl Operator for Sort {
    fn name(&self) -> &'static str {
        "sort"
    }

    async fn run(&self, ctx: &OperatorContext<'_>, args: &[Arg]) -> Result<Value, EngineError> {
        let arg = args.first().ok_or_else(|| EngineError::OperatorFailure {
            path: ctx.node.to_string(),
            operator: self.name().to_string(),
            reason: "sort requires exactly one argument".to_string(),
            remediation: None,
        })?;
        let value = ctx.resolve(arg)?;
        let seq = value.as_sequence().ok_or_else(|| EngineError::OperatorFailure {
            path: ctx.node.to_string(),
            operator: self.name().to_string(),
            reason: "sort argument did not resolve to a sequence".to_string(),
            remediation: None,
        })?;
        let mut sorted = seq.clone();
        sorted.sort_by(|a, b| scalar_to_string(a).cmp(&scalar_to_string(b)));
        Ok(Value::Sequence(sorted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Path, SimpleTree, TreeStore};

    #[tokio::test]
    async fn sorts_sequence_lexicographically() {
        let tree = SimpleTree::default();
        tree.set(
            &Path::parse("tags").unwrap(),
            Value::Sequence(vec![Value::String("z".into()), Value::String("a".into())]),
        )
        .unwrap();
        let node = Path::parse("target").unwrap();
        let ctx = OperatorContext::new(&tree, &node);
        let result = Sort.run(&ctx, &[Arg::Reference(Path::parse("tags").unwrap())]).await.unwrap();
        assert_eq!(result, Value::Sequence(vec![Value::String("a".into()), Value::String("z".into())]));
    }
}
