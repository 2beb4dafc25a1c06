// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::errors::EngineError;
use crate::graph::Arg;
use crate::operator::{Operator, OperatorContext};
use crate::tree::Value;

/// `(( empty ))` or `(( empty map ))` / `(( empty list ))` — produces an
/// empty container, useful as a placeholder target for later merges.
pub struct Empty;

#[async_trait]
impl Operator for Empty {
    fn name(&self) -> &'static str {
        "empty"
    }

    async fn run(&self, ctx: &OperatorContext<'_>, args: &[Arg]) -> Result<Value, EngineError> {
        match args.first() {
            None => Ok(Value::Map(Default::default())),
            Some(arg) => {
                let v = ctx.resolve(arg)?;
                match v.as_str() {
                    Some("list") => Ok(Value::Sequence(Vec::new())),
                    Some("map") | None => Ok(Value::Map(Default::default())),
                    Some(other) => Err(EngineError::OperatorFailure {
                        path: ctx.node.to_string(),
                        operator: self.name().to_string(),
                        reason: format!("unknown empty kind '{other}', expected 'map' or 'list'"),
                        remediation: None,
                    }),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Path, SimpleTree};

    #[tokio::test]
    async fn defaults_to_empty_map() {
        let tree = SimpleTree::default();
        let node = Path::parse("target").unwrap();
        let ctx = OperatorContext::new(&tree, &node);
        assert_eq!(Empty.run(&ctx, &[]).await.unwrap(), Value::Map(Default::default()));
    }

    #[tokio::test]
    async fn list_kind_produces_empty_sequence() {
        let tree = SimpleTree::default();
        let node = Path::parse("target").unwrap();
        let ctx = OperatorContext::new(&tree, &node);
        let result = Empty.run(&ctx, &[Arg::Literal(Value::String("list".into()))]).await.unwrap();
        assert_eq!(result, Value::Sequence(Vec::new()));
    }
}
