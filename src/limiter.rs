use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::HarnessError;

/// Fixed-capacity admission gate for in-flight Vault requests
pub struct Limiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    counters: Arc<Counters>,
}

#[derive(Default)]
struct Counters {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    acquired: AtomicU64,
    released: AtomicU64,
}

/// Point-in-time view of limiter accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimiterSnapshot {
    pub capacity: usize,
    pub in_flight: usize,
    pub peak: usize,
    pub acquired: u64,
    pub released: u64,
}

impl Limiter {
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Wait for a free slot. The slot is held until the permit is dropped.
    pub async fn acquire(&self) -> Result<LimiterPermit, HarnessError> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| HarnessError::LimiterClosed)?;

        let holders = self.counters.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.counters.peak.fetch_max(holders, Ordering::AcqRel);
        self.counters.acquired.fetch_add(1, Ordering::AcqRel);

        Ok(LimiterPermit {
            _permit: permit,
            counters: Arc::clone(&self.counters),
        })
    }

    pub fn snapshot(&self) -> LimiterSnapshot {
        LimiterSnapshot {
            capacity: self.capacity,
            in_flight: self.counters.in_flight.load(Ordering::Acquire),
            peak: self.counters.peak.load(Ordering::Acquire),
            acquired: self.counters.acquired.load(Ordering::Acquire),
            released: self.counters.released.load(Ordering::Acquire),
        }
    }
}

/// A held limiter slot
pub struct LimiterPermit {
    _permit: OwnedSemaphorePermit,
    counters: Arc<Counters>,
}

impl Drop for LimiterPermit {
    fn drop(&mut self) {
        // Counters drop before the semaphore slot is returned.
        self.counters.in_flight.fetch_sub(1, Ordering::AcqRel);
        self.counters.released.fetch_add(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_acquire_release_is_balanced() {
        let limiter = Limiter::new(2);
        let first = limiter.acquire().await.unwrap();
        let second = limiter.acquire().await.unwrap();
        assert_eq!(limiter.snapshot().in_flight, 2);

        drop(first);
        drop(second);

        let snap = limiter.snapshot();
        assert_eq!(snap.in_flight, 0);
        assert_eq!(snap.acquired, 2);
        assert_eq!(snap.released, 2);
        assert_eq!(snap.peak, 2);
    }

    #[tokio::test]
    async fn test_acquire_blocks_at_capacity() {
        let limiter = Limiter::new(1);
        let held = limiter.acquire().await.unwrap();

        let blocked = tokio::time::timeout(Duration::from_millis(20), limiter.acquire()).await;
        assert!(blocked.is_err());

        drop(held);
        let next = tokio::time::timeout(Duration::from_millis(20), limiter.acquire()).await;
        assert!(next.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_never_exceeds_capacity_under_contention() {
        let limiter = Arc::new(Limiter::new(3));
        let mut tasks = tokio::task::JoinSet::new();

        for i in 0..64u64 {
            let limiter = Arc::clone(&limiter);
            tasks.spawn(async move {
                let _permit = limiter.acquire().await.unwrap();
                tokio::time::sleep(Duration::from_millis(i % 4)).await;
            });
        }
        while tasks.join_next().await.is_some() {}

        let snap = limiter.snapshot();
        assert!(snap.peak <= 3, "peak {} exceeded capacity", snap.peak);
        assert_eq!(snap.acquired, 64);
        assert_eq!(snap.released, 64);
        assert_eq!(snap.in_flight, 0);
    }
}
