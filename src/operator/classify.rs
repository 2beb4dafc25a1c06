// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Static operator-name classification, shared by the cost estimator,
//! execution planner, and evaluator so the three don't each keep their
//! own copy of "which operators are safe to batch / run in parallel"
//! (spec §4.9/§4.10/§4.11).

/// Read-only operators whose calls are cheap and independent enough to
/// combine into a single batch task rather than dispatching each
/// separately. `empty` is excluded: its `Inject` result is per-node and
/// doesn't amortize the way a shared batch entrypoint expects.
const BATCHABLE: &[&str] = &[
    "grab", "concat", "base64", "base64-decode", "keys", "join", "sort", "stringify",
];

/// Every operator on the read-only whitelist (spec §4.12) is safe to
/// run concurrently against the shared tree without the thread-safe
/// adapter's exclusive-access serialization.
const PARALLEL_SAFE: &[&str] = &[
    "grab", "concat", "base64", "base64-decode", "keys", "empty", "join", "sort", "stringify",
];

/// Unknown operators default to not-batchable (conservative).
pub fn is_batchable(operator: &str) -> bool {
    BATCHABLE.contains(&operator)
}

/// Mirrors the `conservative` strategy from spec §4.11: only the
/// whitelist is safe, everything else (including anything
/// unregistered) runs sequentially.
pub fn is_parallel_safe(operator: &str) -> bool {
    PARALLEL_SAFE.contains(&operator)
}

/// Operators that cross a process/network boundary. None of the
/// current builtins do; reserved for out-of-process operators, which
/// get the smaller batching discount per spec §4.9.
pub fn is_external(_operator: &str) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_only_operators_are_batchable() {
        for op in BATCHABLE {
            assert!(is_batchable(op));
            assert!(is_parallel_safe(op));
        }
    }

    #[test]
    fn empty_is_parallel_safe_but_not_batchable() {
        assert!(is_parallel_safe("empty"));
        assert!(!is_batchable("empty"));
    }

    #[test]
    fn unknown_operator_is_conservatively_unsafe() {
        assert!(!is_batchable("shell-exec"));
        assert!(!is_parallel_safe("shell-exec"));
    }
}
