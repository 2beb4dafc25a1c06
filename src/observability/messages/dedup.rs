// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt::{Display, Formatter};
use tracing::Span;

use super::StructuredLog;

pub struct RequestCoalesced<'a> {
    pub key: &'a str,
    pub waiters: usize,
}

impl Display for RequestCoalesced<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "coalesced request for '{}', {} waiters attached", self.key, self.waiters)
    }
}

impl StructuredLog for RequestCoalesced<'_> {
    fn log(&self) {
        tracing::debug!(key = self.key, waiters = self.waiters, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("request_coalesced", span_name = name, key = self.key)
    }
}
