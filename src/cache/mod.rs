// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Multi-tier operator-result cache: key generation with collision
//! detection, a sharded in-memory L1, an optional append-only-log L2,
//! and hot-key tracking across both.

mod entry;
mod hotkey;
pub mod key;
mod l1;
mod l2;
mod tier;

pub use entry::CacheEntry;
pub use key::{HashAlgorithm, KeyCollision, KeyGenerator, KeyKind};
pub use l2::L2Cache;
pub use tier::{CacheTier, CacheTierConfig};
