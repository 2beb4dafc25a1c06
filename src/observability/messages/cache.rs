// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt::{Display, Formatter};
use tracing::Span;

use super::StructuredLog;

pub struct CacheEvicted<'a> {
    pub tier: &'a str,
    pub key: &'a str,
    pub reason: &'a str,
}

impl Display for CacheEvicted<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} evicted '{}': {}", self.tier, self.key, self.reason)
    }
}

impl StructuredLog for CacheEvicted<'_> {
    fn log(&self) {
        tracing::debug!(tier = self.tier, key = self.key, reason = self.reason, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("cache_evicted", span_name = name, tier = self.tier)
    }
}

pub struct L2Corrupt<'a> {
    pub path: &'a str,
    pub recovered_entries: usize,
}

impl Display for L2Corrupt<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "L2 cache file '{}' was corrupt, recovered {} entries before truncation",
            self.path, self.recovered_entries
        )
    }
}

impl StructuredLog for L2Corrupt<'_> {
    fn log(&self) {
        tracing::warn!(path = self.path, recovered_entries = self.recovered_entries, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("l2_corrupt", span_name = name)
    }
}
