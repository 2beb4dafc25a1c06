// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::errors::EngineError;
use crate::graph::Arg;
use crate::operator::{Operator, OperatorContext};
use crate::tree::Value;

/// `(( grab path.to.value ))` — copies the value found at a single
/// reference elsewhere in the document.
pub struct Grab;

#[async_trait]
impl Operator for Grab {
    fn name(&self) -> &'static str {
        "grab"
    }

    async fn run(&self, ctx: &OperatorContext<'_>, args: &[Arg]) -> Result<Value, EngineError> {
        let arg = args.first().ok_or_else(|| EngineError::OperatorFailure {
            path: ctx.node.to_string(),
            operator: self.name().to_string(),
            reason: "grab requires exactly one argument".to_string(),
            remediation: Some("(( grab some.path ))".to_string()),
        })?;
        ctx.resolve(arg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Path, SimpleTree, TreeStore};

    #[tokio::test]
    async fn grabs_value_at_reference() {
        let tree = SimpleTree::default();
        tree.set(&Path::parse("meta.owner").unwrap(), Value::String("alice".into()))
            .unwrap();
        let node = Path::parse("target").unwrap();
        let ctx = OperatorContext::new(&tree, &node);
        let result = Grab
            .run(&ctx, &[Arg::Reference(Path::parse("meta.owner").unwrap())])
            .await
            .unwrap();
        assert_eq!(result, Value::String("alice".into()));
    }
}
