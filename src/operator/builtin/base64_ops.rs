// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::errors::EngineError;
use crate::graph::Arg;
use crate::operator::{Operator, OperatorContext};
use crate::tree::Value;

use super::concat::scalar_to_string;

fn single_string_arg(ctx: &OperatorContext<'_>, operator: &str, args: &[Arg]) -> Result<String, EngineError> {
    let arg = args.first().ok_or_else(|| EngineError::OperatorFailure {
        path: ctx.node.to_string(),
        operator: operator.to_string(),
        reason: format!("{operator} requires exactly one argument"),
        remediation: None,
    })?;
    Ok(scalar_to_string(&ctx.resolve(arg)?))
}

/// `(( base64 value ))` — encodes a value as standard base64.
pub struct Base64Encode;

#[async_trait]
impl Operator for Base64Encode {
    fn name(&self) -> &'static str {
        "base64"
    }

    async fn run(&self, ctx: &OperatorContext<'_>, args: &[Arg]) -> Result<Value, EngineError> {
        let s = single_string_arg(ctx, self.name(), args)?;
        Ok(Value::String(STANDARD.encode(s.as_bytes())))
    }
}

/// `(( base64-decode value ))` — decodes a standard base64 string.
pub struct Base64Decode;

#[async_trait]
impl Operator for Base64Decode {
    fn name(&self) -> &'static str {
        "base64-decode"
    }

    async fn run(&self, ctx: &OperatorContext<'_>, args: &[Arg]) -> Result<Value, EngineError> {
        let s = single_string_arg(ctx, self.name(), args)?;
        let bytes = STANDARD.decode(s.as_bytes()).map_err(|e| EngineError::OperatorFailure {
            path: ctx.node.to_string(),
            operator: self.name().to_string(),
            reason: format!("invalid base64: {e}"),
            remediation: None,
        })?;
        let decoded = String::from_utf8(bytes).map_err(|e| EngineError::OperatorFailure {
            path: ctx.node.to_string(),
            operator: self.name().to_string(),
            reason: format!("decoded bytes are not valid utf-8: {e}"),
            remediation: None,
        })?;
        Ok(Value::String(decoded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Path, SimpleTree};

    #[tokio::test]
    async fn round_trips_through_encode_and_decode() {
        let tree = SimpleTree::default();
        let node = Path::parse("target").unwrap();
        let ctx = OperatorContext::new(&tree, &node);
        let encoded = Base64Encode
            .run(&ctx, &[Arg::Literal(Value::String("graftwood".into()))])
            .await
            .unwrap();
        let decoded = Base64Decode.run(&ctx, &[Arg::Literal(encoded)]).await.unwrap();
        assert_eq!(decoded, Value::String("graftwood".into()));
    }

    #[tokio::test]
    async fn rejects_invalid_base64() {
        let tree = SimpleTree::default();
        let node = Path::parse("target").unwrap();
        let ctx = OperatorContext::new(&tree, &node);
        let err = Base64Decode
            .run(&ctx, &[Arg::Literal(Value::String("not valid base64!!".into()))])
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::OperatorFailure { .. }));
    }
}
