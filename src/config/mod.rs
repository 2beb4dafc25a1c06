// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The engine's configuration envelope: document structure, defaults,
//! and environment-variable overrides.

mod env;
mod loader;

pub use env::apply_env_overrides;
pub use loader::{CacheConfig, Config, ConcurrencyConfig, ConfigError, CostConfig, DedupConfig, load_config, load_config_from_path};
