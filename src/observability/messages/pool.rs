// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt::{Display, Formatter};
use tracing::Span;

use super::StructuredLog;

pub struct PoolExhausted<'a> {
    pub pool: &'a str,
    pub max_size: usize,
}

impl Display for PoolExhausted<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "pool '{}' exhausted (max_size={}), constructing temporary client", self.pool, self.max_size)
    }
}

impl StructuredLog for PoolExhausted<'_> {
    fn log(&self) {
        tracing::warn!(pool = self.pool, max_size = self.max_size, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("pool_exhausted", span_name = name, pool = self.pool)
    }
}
