// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::errors::EngineError;
use crate::graph::Arg;
use crate::operator::{Operator, OperatorContext};
use crate::tree::Value;

/// `(( keys path.to.map ))` — the sorted key list of a map, as a
/// sequence of strings.
pub struct Keys;

#[async_trait]
impl Operator for Keys {
    fn name(&self) -> &'static str {
        "keys"
    }

    async fn run(&self, ctx: &OperatorContext<'_>, args: &[Arg]) -> Result<Value, EngineError> {
        let arg = args.first().ok_or_else(|| EngineError::OperatorFailure {
            path: ctx.node.to_string(),
            operator: self.name().to_string(),
            reason: "keys requires exactly one argument".to_string(),
            remediation: None,
        })?;
        let value = ctx.resolve(arg)?;
        let map = value.as_map().ok_or_else(|| EngineError::OperatorFailure {
            path: ctx.node.to_string(),
            operator: self.name().to_string(),
            reason: "keys argument did not resolve to a map".to_string(),
            remediation: None,
        })?;
        let mut keys: Vec<String> = map.keys().cloned().collect();
        keys.sort();
        Ok(Value::Sequence(keys.into_iter().map(Value::String).collect()))
    }
}
