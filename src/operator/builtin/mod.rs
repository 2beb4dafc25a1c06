// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Builtin operators, mirroring the teacher's `backends::local`
//! in-process processor set one for one against this engine's
//! argument/value model.

pub mod base64_ops;
pub mod concat;
pub mod empty;
pub mod grab;
pub mod join;
pub mod keys;
pub mod sort;
pub mod stringify;

use std::sync::Arc;

use super::OperatorRegistry;

pub fn register_all(registry: &mut OperatorRegistry) {
    registry.register(Arc::new(grab::Grab));
    registry.register(Arc::new(concat::Concat));
    registry.register(Arc::new(base64_ops::Base64Encode));
    registry.register(Arc::new(base64_ops::Base64Decode));
    registry.register(Arc::new(keys::Keys));
    registry.register(Arc::new(empty::Empty));
    registry.register(Arc::new(join::Join));
    registry.register(Arc::new(sort::Sort));
    registry.register(Arc::new(stringify::Stringify));
}
