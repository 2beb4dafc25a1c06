// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::time::Duration;

use serde::Deserialize;

/// How a stage reacts to a failing node within it.
///
/// Mirrors the three-way choice graft/spruce-family engines expose:
/// stop at the first failure, keep going and report everything, or keep
/// going but only complete what a majority of dependents can still use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStrategy {
    FailFast,
    ContinueOnError,
    BestEffort,
}

impl Default for FailureStrategy {
    fn default() -> Self {
        FailureStrategy::FailFast
    }
}

/// The error taxonomy named in the evaluation engine's error-handling design.
///
/// Each variant is a *kind*, not a type hierarchy: callers match on the
/// variant to decide remediation, and `Display` always names the failing
/// path/operator where one is known.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("malformed document or operator expression at '{path}': {reason}")]
    Parse { path: String, reason: String },

    #[error("operator '{operator}' at '{path}' references missing or mis-typed path '{reference}'")]
    Reference {
        path: String,
        operator: String,
        reference: String,
    },

    #[error("cyclic dependency detected: {}", .cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    #[error("operator '{operator}' at '{path}' failed: {reason}")]
    OperatorFailure {
        path: String,
        operator: String,
        reason: String,
        remediation: Option<String>,
    },

    #[error("external call for operator '{operator}' at '{path}' failed: {reason}")]
    External {
        path: String,
        operator: String,
        reason: String,
    },

    #[error("lock on path '{path}' timed out after {timeout:?}")]
    LockTimeout { path: String, timeout: Duration },

    #[error("planning failed: {reason}")]
    Planning { reason: String },

    #[error("evaluation failed: {reason}")]
    Evaluation { reason: String },

    #[error("stage cancelled: {reason}")]
    Cancelled { reason: String },

    #[error("internal invariant violated: {message}")]
    Internal { message: String },
}

impl EngineError {
    pub fn internal(message: impl Into<String>) -> Self {
        EngineError::Internal {
            message: message.into(),
        }
    }

    /// The path this error names, when one is known. Used to build the
    /// single user-visible error message the engine surfaces (spec §7):
    /// failing path, operator, cause, and (when present) remediation.
    pub fn path(&self) -> Option<&str> {
        match self {
            EngineError::Parse { path, .. } => Some(path),
            EngineError::Reference { path, .. } => Some(path),
            EngineError::OperatorFailure { path, .. } => Some(path),
            EngineError::External { path, .. } => Some(path),
            EngineError::LockTimeout { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// A first-failure-plus-tail error report, as spec §7 requires: "the
/// evaluation returns the first failure with a list of subsequent errors
/// attached". Verbose mode surfaces `skipped` too.
#[derive(Debug)]
pub struct EvaluationReport {
    pub first: EngineError,
    pub subsequent: Vec<EngineError>,
    pub skipped: Vec<String>,
}

impl std::fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.first)?;
        if !self.subsequent.is_empty() {
            write!(f, " (+{} more errors)", self.subsequent.len())?;
        }
        Ok(())
    }
}

impl std::error::Error for EvaluationReport {}
