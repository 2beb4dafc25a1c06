// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod engine;
mod validation;

pub use engine::{EngineError, FailureStrategy};
pub use validation::ValidationError;
