// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::errors::EngineError;
use crate::graph::Arg;
use crate::operator::{Operator, OperatorContext};
use crate::tree::Value;

/// `(( stringify path.to.value ))` — renders any value (including
/// maps and sequences) as a JSON string, useful for embedding a
/// sub-document as a literal.
pub struct Stringify;

#[async_trait]
impl Operator for Stringify {
    fn name(&self) -> &'static str {
        "stringify"
    }

    async fn run(&self, ctx: &OperatorContext<'_>, args: &[Arg]) -> Result<Value, EngineError> {
        let arg = args.first().ok_or_else(|| EngineError::OperatorFailure {
            path: ctx.node.to_string(),
            operator: self.name().to_string(),
            reason: "stringify requires exactly one argument".to_string(),
            remediation: None,
        })?;
        let value = ctx.resolve(arg)?;
        let json = value.to_json().map_err(|e| EngineError::OperatorFailure {
            path: ctx.node.to_string(),
            operator: self.name().to_string(),
            reason: format!("value could not be serialized: {e}"),
            remediation: None,
        })?;
        Ok(Value::String(json.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Path, SimpleTree, TreeStore};
    use std::collections::HashMap;

    #[tokio::test]
    async fn stringifies_a_map() {
        let tree = SimpleTree::default();
        tree.set(
            &Path::parse("meta").unwrap(),
            Value::Map(HashMap::from([("owner".to_string(), Value::String("alice".into()))])),
        )
        .unwrap();
        let node = Path::parse("target").unwrap();
        let ctx = OperatorContext::new(&tree, &node);
        let result = Stringify.run(&ctx, &[Arg::Reference(Path::parse("meta").unwrap())]).await.unwrap();
        assert_eq!(result, Value::String(r#"{"owner":"alice"}"#.to_string()));
    }
}
