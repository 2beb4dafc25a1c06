// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::Arc;

use super::Operator;

/// Maps operator names to their implementation, built once at engine
/// construction and shared read-only across waves.
#[derive(Clone, Default)]
pub struct OperatorRegistry {
    operators: HashMap<&'static str, Arc<dyn Operator>>,
}

impl OperatorRegistry {
    pub fn new() -> Self {
        OperatorRegistry::default()
    }

    pub fn register(&mut self, operator: Arc<dyn Operator>) {
        self.operators.insert(operator.name(), operator);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Operator>> {
        self.operators.get(name).cloned()
    }

    pub fn with_builtins() -> Self {
        let mut registry = OperatorRegistry::new();
        super::builtin::register_all(&mut registry);
        registry
    }
}
