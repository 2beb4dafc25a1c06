// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Request deduplication: concurrent evaluations of the same operator
//! call (same fingerprint) coalesce onto a single in-flight future
//! instead of each doing the work independently.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::sync::Mutex;

use crate::errors::EngineError;
use crate::metrics::Metrics;
use crate::observability::messages::dedup::RequestCoalesced;
use crate::observability::messages::StructuredLog;
use crate::tree::Value;

type Outcome = Result<Value, String>;

struct PendingRequest {
    sender: broadcast::Sender<Outcome>,
    waiters: usize,
}

/// Coalesces concurrent callers requesting the same fingerprint. The
/// first caller to arrive actually runs the work; everyone else
/// subscribes to its result. A background janitor periodically drops
/// entries whose broadcast channel has no more receivers, bounding
/// memory use across a long-running evaluation.
pub struct Deduplicator {
    inflight: Mutex<HashMap<String, PendingRequest>>,
    timeout: Duration,
    metrics: Arc<Metrics>,
}

impl Deduplicator {
    pub fn new(timeout: Duration) -> Arc<Self> {
        let dedup = Arc::new(Deduplicator {
            inflight: Mutex::new(HashMap::new()),
            timeout,
            metrics: Arc::new(Metrics::new()),
        });
        dedup.clone().spawn_janitor();
        dedup
    }

    /// The counters this deduplicator records into: `"dedup.hits"`
    /// (a caller coalesced onto an in-flight leader), `"dedup.misses"`
    /// (a caller became the leader), `"dedup.timeouts"`, and
    /// `"dedup.errors"` (the leader's work returned `Err`).
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Fraction of callers that coalesced onto an in-flight leader
    /// rather than becoming one themselves.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.metrics.counter("dedup.hits").get() as f64;
        let misses = self.metrics.counter("dedup.misses").get() as f64;
        if hits + misses == 0.0 {
            0.0
        } else {
            hits / (hits + misses)
        }
    }

    fn spawn_janitor(self: Arc<Self>) {
        let interval = self.timeout * 2;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let mut inflight = self.inflight.lock().await;
                inflight.retain(|_, pending| pending.sender.receiver_count() > 0);
            }
        });
    }

    /// Runs `work` exactly once per distinct `key` among concurrent
    /// callers; everyone sharing a key gets the same result.
    pub async fn run<F, Fut>(&self, key: &str, work: F) -> Result<Value, EngineError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Value, EngineError>>,
    {
        let mut receiver = {
            let mut inflight = self.inflight.lock().await;
            if let Some(pending) = inflight.get_mut(key) {
                pending.waiters += 1;
                RequestCoalesced {
                    key,
                    waiters: pending.waiters,
                }
                .log();
                self.metrics.counter("dedup.hits").incr();
                Some(pending.sender.subscribe())
            } else {
                let (tx, _rx) = broadcast::channel(1);
                inflight.insert(
                    key.to_string(),
                    PendingRequest {
                        sender: tx,
                        waiters: 1,
                    },
                );
                self.metrics.counter("dedup.misses").incr();
                None
            }
        };

        if let Some(rx) = receiver.take() {
            return self.await_follower(rx).await;
        }

        let result = match tokio::time::timeout(self.timeout, work()).await {
            Ok(result) => result,
            Err(_) => {
                self.metrics.counter("dedup.timeouts").incr();
                let mut inflight = self.inflight.lock().await;
                if let Some(pending) = inflight.remove(key) {
                    let _ = pending.sender.send(Err("leader timed out".to_string()));
                }
                return Err(EngineError::internal(format!(
                    "dedup leader for '{key}' timed out after {:?}",
                    self.timeout
                )));
            }
        };
        if result.is_err() {
            self.metrics.counter("dedup.errors").incr();
        }
        let broadcastable: Outcome = result.as_ref().map(Clone::clone).map_err(|e| e.to_string());
        let mut inflight = self.inflight.lock().await;
        if let Some(pending) = inflight.remove(key) {
            let _ = pending.sender.send(broadcastable);
        }
        result
    }

    async fn await_follower(&self, mut rx: broadcast::Receiver<Outcome>) -> Result<Value, EngineError> {
        match rx.recv().await {
            Ok(Ok(v)) => Ok(v),
            Ok(Err(msg)) => Err(EngineError::internal(msg)),
            Err(_) => Err(EngineError::internal("leader request dropped before completing")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn concurrent_callers_share_one_execution() {
        let dedup = Deduplicator::new(Duration::from_millis(50));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let dedup = dedup.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                dedup
                    .run("op:1", || {
                        let calls = calls.clone();
                        async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            Ok(Value::Int(42))
                        }
                    })
                    .await
            }));
        }

        for h in handles {
            assert_eq!(h.await.unwrap().unwrap(), Value::Int(42));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_keys_run_independently() {
        let dedup = Deduplicator::new(Duration::from_millis(50));
        let a = dedup.run("op:a", || async { Ok(Value::Int(1)) }).await.unwrap();
        let b = dedup.run("op:b", || async { Ok(Value::Int(2)) }).await.unwrap();
        assert_eq!(a, Value::Int(1));
        assert_eq!(b, Value::Int(2));
    }

    #[tokio::test]
    async fn leader_exceeding_timeout_reports_an_error() {
        let dedup = Deduplicator::new(Duration::from_millis(10));
        let err = dedup
            .run("op:slow", || async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(Value::Int(1))
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
        assert_eq!(dedup.metrics.counter("dedup.timeouts").get(), 1);
    }

    #[tokio::test]
    async fn hit_rate_reflects_coalesced_callers() {
        let dedup = Deduplicator::new(Duration::from_millis(50));
        dedup.run("op:a", || async { Ok(Value::Int(1)) }).await.unwrap();
        dedup.run("op:b", || async { Ok(Value::Int(2)) }).await.unwrap();
        assert_eq!(dedup.hit_rate(), 0.0);
    }
}
