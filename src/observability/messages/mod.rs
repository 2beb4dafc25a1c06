// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod cache;
pub mod dedup;
pub mod engine;
pub mod operator;
pub mod pool;
pub mod validation;

use tracing::Span;

/// A message type that can both print (`Display`) and log itself with
/// structured fields, and open a named tracing span carrying those same
/// fields as attributes.
pub trait StructuredLog {
    fn log(&self);
    fn span(&self, name: &str) -> Span;
}
