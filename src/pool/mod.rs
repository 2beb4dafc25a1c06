// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! A bounded pool of reusable clients, generic over whatever an
//! external-backend operator needs (an HTTP client, a gRPC channel, a
//! file handle) so operator code never opens one per call.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Semaphore};

use crate::observability::messages::pool::PoolExhausted;
use crate::observability::messages::StructuredLog;

/// Marker bound for anything that can live in a `ConnectionPool`.
pub trait Poolable: Send + Sync + 'static {}
impl<T: Send + Sync + 'static> Poolable for T {}

/// A bounded pool of `T`, constructed lazily via an async factory. When
/// the pool is at capacity and empty, `acquire` waits for a lease to be
/// returned rather than growing past `max_size`.
pub struct ConnectionPool<T: Poolable> {
    idle: Mutex<VecDeque<T>>,
    permits: Arc<Semaphore>,
    max_size: usize,
    factory: Box<dyn Fn() -> futures_factory::BoxFuture<T> + Send + Sync>,
    name: &'static str,
}

/// A checked-out client. Dropping it returns the client to the pool's
/// idle queue and releases its permit.
pub struct Lease<T: Poolable> {
    value: Option<T>,
    pool: Arc<ConnectionPool<T>>,
    _permit: tokio::sync::OwnedSemaphorePermit,
}

impl<T: Poolable> std::ops::Deref for Lease<T> {
    type Target = T;
    fn deref(&self) -> &T {
        self.value.as_ref().expect("value taken only on drop")
    }
}

impl<T: Poolable> std::ops::DerefMut for Lease<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.value.as_mut().expect("value taken only on drop")
    }
}

impl<T: Poolable> Drop for Lease<T> {
    fn drop(&mut self) {
        if let Some(value) = self.value.take() {
            let pool = self.pool.clone();
            tokio::spawn(async move {
                pool.idle.lock().await.push_back(value);
            });
        }
    }
}

mod futures_factory {
    use std::future::Future;
    use std::pin::Pin;
    pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
}

impl<T: Poolable> ConnectionPool<T> {
    pub fn new<F, Fut>(name: &'static str, max_size: usize, factory: F) -> Arc<Self>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = T> + Send + 'static,
    {
        Arc::new(ConnectionPool {
            idle: Mutex::new(VecDeque::new()),
            permits: Arc::new(Semaphore::new(max_size)),
            max_size,
            factory: Box::new(move || Box::pin(factory())),
            name,
        })
    }

    pub async fn acquire(self: &Arc<Self>) -> Lease<T> {
        let permit = match self.permits.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                PoolExhausted {
                    pool: self.name,
                    max_size: self.max_size,
                }
                .log();
                self.permits.clone().acquire_owned().await.expect("semaphore never closes")
            }
        };
        let value = self.idle.lock().await.pop_front();
        let value = match value {
            Some(v) => v,
            None => (self.factory)().await,
        };
        Lease {
            value: Some(value),
            pool: self.clone(),
            _permit: permit,
        }
    }

    pub async fn acquire_timeout(self: &Arc<Self>, timeout: Duration) -> Option<Lease<T>> {
        tokio::time::timeout(timeout, self.acquire()).await.ok()
    }

    pub async fn idle_len(&self) -> usize {
        self.idle.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn reuses_returned_clients_instead_of_reconstructing() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        let pool = ConnectionPool::new("test", 2, move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                42u32
            }
        });

        {
            let lease = pool.acquire().await;
            assert_eq!(*lease, 42);
        }
        tokio::task::yield_now().await;
        let _lease2 = pool.acquire().await;
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn acquire_timeout_returns_none_when_exhausted() {
        let pool = ConnectionPool::new("test", 1, || async { 1u32 });
        let _held = pool.acquire().await;
        let second = pool.acquire_timeout(Duration::from_millis(20)).await;
        assert!(second.is_none());
    }
}
