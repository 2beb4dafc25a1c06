// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::errors::EngineError;
use crate::graph::Arg;
use crate::operator::{Operator, OperatorContext};
use crate::tree::Value;

use super::concat::scalar_to_string;

/// `(( join "," path.to.sequence ))` — joins a sequence's elements
/// with the given separator.
pub struct Join;

#[async_trait]
impl Operator for Join {
    fn name(&self) -> &'static str {
        "join"
    }

    async fn run(&self, ctx: &OperatorContext<'_>, args: &[Arg]) -> Result<Value, EngineError> {
        if args.len() != 2 {
            return Err(EngineError::OperatorFailure {
                path: ctx.node.to_string(),
                operator: self.name().to_string(),
                reason: "join requires a separator and a sequence argument".to_string(),
                remediation: Some(r#"(( join "," path.to.list ))"#.to_string()),
            });
        }
        let separator = scalar_to_string(&ctx.resolve(&args[0])?);
        let value = ctx.resolve(&args[1])?;
        let seq = value.as_sequence().ok_or_else(|| EngineError::OperatorFailure {
            path: ctx.node.to_string(),
            operator: self.name().to_string(),
            reason: "join's second argument did not resolve to a sequence".to_string(),
            remediation: None,
        })?;
        let joined = seq.iter().map(scalar_to_string).collect::<Vec<_>>().join(&separator);
        Ok(Value::String(joined))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Path, SimpleTree, TreeStore};

    #[tokio::test]
    async fn joins_sequence_with_separator() {
        let tree = SimpleTree::default();
        tree.set(
            &Path::parse("tags").unwrap(),
            Value::Sequence(vec![Value::String("a".into()), Value::String("b".into())]),
        )
        .unwrap();
        let node = Path::parse("target").unwrap();
        let ctx = OperatorContext::new(&tree, &node);
        let result = Join
            .run(
                &ctx,
                &[Arg::Literal(Value::String(",".into())), Arg::Reference(Path::parse("tags").unwrap())],
            )
            .await
            .unwrap();
        assert_eq!(result, Value::String("a,b".into()));
    }
}
