// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structured logging for the evaluation engine.
//!
//! Message types live one-per-subsystem under `messages::*`. Each type
//! implements `Display` for human-readable output and `StructuredLog` for
//! machine-readable fields plus span creation, so a JSON-formatting
//! `tracing-subscriber` layer gets queryable fields without any string
//! parsing.

pub mod messages;
