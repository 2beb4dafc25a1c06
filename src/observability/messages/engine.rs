// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for evaluation lifecycle events: planning, stage
//! dispatch, and overall completion/failure.

use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

use super::StructuredLog;

pub struct EvaluationStarted<'a> {
    pub node_count: usize,
    pub wave_count: usize,
    pub strategy: &'a str,
}

impl Display for EvaluationStarted<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "starting evaluation: {} nodes across {} waves, strategy={}",
            self.node_count, self.wave_count, self.strategy
        )
    }
}

impl StructuredLog for EvaluationStarted<'_> {
    fn log(&self) {
        tracing::info!(
            node_count = self.node_count,
            wave_count = self.wave_count,
            strategy = self.strategy,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "evaluation",
            span_name = name,
            node_count = self.node_count,
            wave_count = self.wave_count,
        )
    }
}

pub struct EvaluationCompleted {
    pub node_count: usize,
    pub duration: Duration,
}

impl Display for EvaluationCompleted {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "evaluation completed: {} nodes in {:?}",
            self.node_count, self.duration
        )
    }
}

impl StructuredLog for EvaluationCompleted {
    fn log(&self) {
        tracing::info!(
            node_count = self.node_count,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("evaluation_completed", span_name = name, node_count = self.node_count)
    }
}

pub struct StageFailed<'a> {
    pub stage_index: usize,
    pub node_id: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for StageFailed<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "stage {} failed at node '{}': {}",
            self.stage_index, self.node_id, self.error
        )
    }
}

impl StructuredLog for StageFailed<'_> {
    fn log(&self) {
        tracing::error!(
            stage_index = self.stage_index,
            node_id = self.node_id,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("stage_failed", span_name = name, stage_index = self.stage_index)
    }
}

pub struct SlowOperation<'a> {
    pub node_id: &'a str,
    pub operator: &'a str,
    pub duration: Duration,
    pub threshold: Duration,
}

impl Display for SlowOperation<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "slow operator '{}' at '{}': {:?} (threshold {:?})",
            self.operator, self.node_id, self.duration, self.threshold
        )
    }
}

impl StructuredLog for SlowOperation<'_> {
    fn log(&self) {
        tracing::warn!(
            node_id = self.node_id,
            operator = self.operator,
            duration_ms = self.duration.as_millis() as u64,
            threshold_ms = self.threshold.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("slow_operation", span_name = name, node_id = self.node_id)
    }
}

/// One row of a rendered `TimerArena`: how long a stage (or the
/// evaluation as a whole) took, at a given nesting depth.
pub struct StageTiming<'a> {
    pub depth: usize,
    pub label: &'a str,
    pub duration: Duration,
}

impl Display for StageTiming<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}: {:?}", "  ".repeat(self.depth), self.label, self.duration)
    }
}

impl StructuredLog for StageTiming<'_> {
    fn log(&self) {
        tracing::debug!(
            depth = self.depth,
            label = self.label,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("stage_timing", span_name = name, label = self.label)
    }
}
