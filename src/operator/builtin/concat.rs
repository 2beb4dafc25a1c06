// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::errors::EngineError;
use crate::graph::Arg;
use crate::operator::{Operator, OperatorContext};
use crate::tree::Value;

/// `(( concat a b c ))` — stringifies each argument and joins them with
/// no separator.
pub struct Concat;

#[async_trait]
impl Operator for Concat {
    fn name(&self) -> &'static str {
        "concat"
    }

    async fn run(&self, ctx: &OperatorContext<'_>, args: &[Arg]) -> Result<Value, EngineError> {
        let mut out = String::new();
        for arg in args {
            let v = ctx.resolve(arg)?;
            out.push_str(&scalar_to_string(&v));
        }
        Ok(Value::String(out))
    }
}

pub(crate) fn scalar_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Path, SimpleTree, TreeStore};

    #[tokio::test]
    async fn concatenates_literal_and_reference_args() {
        let tree = SimpleTree::default();
        tree.set(&Path::parse("name").unwrap(), Value::String("world".into())).unwrap();
        let node = Path::parse("target").unwrap();
        let ctx = OperatorContext::new(&tree, &node);
        let result = Concat
            .run(
                &ctx,
                &[
                    Arg::Literal(Value::String("hello ".into())),
                    Arg::Reference(Path::parse("name").unwrap()),
                ],
            )
            .await
            .unwrap();
        assert_eq!(result, Value::String("hello world".into()));
    }
}
