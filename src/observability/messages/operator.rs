// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt::{Display, Formatter};
use tracing::Span;

use super::StructuredLog;

pub struct OperatorExecutionFailed<'a> {
    pub node_id: &'a str,
    pub operator: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for OperatorExecutionFailed<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "operator '{}' at '{}' failed: {}", self.operator, self.node_id, self.error)
    }
}

impl StructuredLog for OperatorExecutionFailed<'_> {
    fn log(&self) {
        tracing::error!(
            node_id = self.node_id,
            operator = self.operator,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("operator_failed", span_name = name, node_id = self.node_id, operator = self.operator)
    }
}

pub struct OperatorRetried<'a> {
    pub node_id: &'a str,
    pub operator: &'a str,
    pub attempt: u32,
    pub max_attempts: u32,
}

impl Display for OperatorRetried<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "retrying operator '{}' at '{}' (attempt {}/{})",
            self.operator, self.node_id, self.attempt, self.max_attempts
        )
    }
}

impl StructuredLog for OperatorRetried<'_> {
    fn log(&self) {
        tracing::warn!(
            node_id = self.node_id,
            operator = self.operator,
            attempt = self.attempt,
            max_attempts = self.max_attempts,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("operator_retried", span_name = name, node_id = self.node_id)
    }
}
