// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use dashmap::DashMap;
use sha2::{Digest, Sha256};

/// Which digest backs a generated cache key. FNV-32 is cheap and
/// sufficient for short operator-argument keys; SHA-256 is available
/// for callers that need collision resistance over larger payloads
/// (e.g. keys derived from whole sub-documents).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Fnv32,
    Sha256,
}

impl Default for HashAlgorithm {
    fn default() -> Self {
        HashAlgorithm::Fnv32
    }
}

const FNV32_OFFSET: u32 = 2166136261;
const FNV32_PRIME: u32 = 16777619;

fn fnv32(bytes: &[u8]) -> u32 {
    let mut hash = FNV32_OFFSET;
    for &b in bytes {
        hash ^= b as u32;
        hash = hash.wrapping_mul(FNV32_PRIME);
    }
    hash
}

/// Key namespace, encoded as a short prefix so keys from different
/// subsystems never collide even if their hash digests do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// Result of evaluating an operator expression: `ex:`
    Expression,
    /// Raw operator-call fingerprint used for dedup: `op:`
    OperatorCall,
    /// Tokenized intermediate form: `tk:`
    Token,
    /// Cached parse of a document: `pr:`
    Parse,
}

impl KeyKind {
    fn prefix(self) -> &'static str {
        match self {
            KeyKind::Expression => "ex:",
            KeyKind::OperatorCall => "op:",
            KeyKind::Token => "tk:",
            KeyKind::Parse => "pr:",
        }
    }
}

/// Common path prefixes are rewritten to a single character before
/// hashing, so the source strings that differ only in a long shared
/// prefix (e.g. many operators all reading under `properties.`) hash
/// more cheaply and stay legible when logged.
const STATIC_PREFIXES: &[(&str, &str)] = &[
    ("meta.", "m."),
    ("database.", "db."),
    ("properties.", "p."),
    ("params.", "pa."),
];

fn compress(input: &str) -> String {
    for (long, short) in STATIC_PREFIXES {
        if let Some(rest) = input.strip_prefix(long) {
            return format!("{short}{rest}");
        }
    }
    input.to_string()
}

/// Generates cache keys for a given namespace and digest algorithm,
/// and tracks every (key, source) pair it has produced so a later
/// digest collision between two different sources can be detected and
/// reported rather than silently served as a cache hit.
pub struct KeyGenerator {
    kind: KeyKind,
    algorithm: HashAlgorithm,
    seen: DashMap<String, String>,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("cache key collision: '{source}' and '{existing_source}' both hash to '{key}'")]
pub struct KeyCollision {
    pub key: String,
    pub source: String,
    pub existing_source: String,
}

impl KeyGenerator {
    pub fn new(kind: KeyKind, algorithm: HashAlgorithm) -> Self {
        KeyGenerator {
            kind,
            algorithm,
            seen: DashMap::new(),
        }
    }

    fn digest(&self, compressed: &str) -> String {
        match self.algorithm {
            HashAlgorithm::Fnv32 => format!("{:08x}", fnv32(compressed.as_bytes())),
            HashAlgorithm::Sha256 => {
                let mut hasher = Sha256::new();
                hasher.update(compressed.as_bytes());
                hex::encode(hasher.finalize())
            }
        }
    }

    /// Generates the key for `source`, recording the mapping. Returns
    /// `Err` if this digest was already produced for a *different*
    /// source string (a genuine collision rather than a repeat lookup).
    pub fn generate(&self, source: &str) -> Result<String, KeyCollision> {
        let compressed = compress(source);
        let digest = self.digest(&compressed);
        let key = format!("{}{}", self.kind.prefix(), digest);

        match self.seen.get(&key) {
            Some(existing) if existing.as_str() != source => Err(KeyCollision {
                key: key.clone(),
                source: source.to_string(),
                existing_source: existing.clone(),
            }),
            Some(_) => Ok(key),
            None => {
                self.seen.insert(key.clone(), source.to_string());
                Ok(key)
            }
        }
    }
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_source_produces_same_key() {
        let gen = KeyGenerator::new(KeyKind::Expression, HashAlgorithm::Fnv32);
        let a = gen.generate("meta.owner").unwrap();
        let b = gen.generate("meta.owner").unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("ex:"));
    }

    #[test]
    fn prefix_is_namespaced_by_kind() {
        let expr = KeyGenerator::new(KeyKind::Expression, HashAlgorithm::Fnv32);
        let op = KeyGenerator::new(KeyKind::OperatorCall, HashAlgorithm::Fnv32);
        assert!(expr.generate("x").unwrap().starts_with("ex:"));
        assert!(op.generate("x").unwrap().starts_with("op:"));
    }

    #[test]
    fn sha256_algorithm_produces_longer_digest_than_fnv() {
        let fnv = KeyGenerator::new(KeyKind::Expression, HashAlgorithm::Fnv32);
        let sha = KeyGenerator::new(KeyKind::Expression, HashAlgorithm::Sha256);
        let a = fnv.generate("meta.owner").unwrap();
        let b = sha.generate("meta.owner").unwrap();
        assert!(b.len() > a.len());
    }
}
