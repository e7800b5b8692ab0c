// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pending-work counter and the "animations ready" barrier.
//!
//! Anything that can still change segment lists or durations (a sequence
//! run, a media metadata lookup) holds a [`PendingGuard`]. A headless driver
//! awaits [`PendingWork::wait_ready`] before capturing a frame.

use std::sync::Arc;
use tokio::sync::watch;

/// Shared counter of in-flight animation work
#[derive(Debug, Clone)]
pub struct PendingWork {
    count: Arc<watch::Sender<usize>>,
}

impl PendingWork {
    /// Create a counter starting at zero
    pub fn new() -> Self {
        let (count, _) = watch::channel(0);
        Self {
            count: Arc::new(count),
        }
    }

    /// Current number of pending operations
    pub fn count(&self) -> usize {
        *self.count.borrow()
    }

    /// Whether nothing is pending right now
    pub fn is_idle(&self) -> bool {
        self.count() == 0
    }

    /// Register one pending operation until the guard drops
    pub fn guard(&self) -> PendingGuard {
        self.count.send_modify(|count| *count += 1);
        PendingGuard {
            count: Arc::clone(&self.count),
        }
    }

    /// Resolve once the counter is zero and stays zero through one scheduler tick
    pub async fn wait_ready(&self) {
        let mut rx = self.count.subscribe();
        loop {
            // The sender lives in `self`, so the channel cannot close here.
            let _ = rx.wait_for(|count| *count == 0).await;
            tokio::task::yield_now().await;
            if *rx.borrow_and_update() == 0 {
                return;
            }
        }
    }
}

impl Default for PendingWork {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the pending counter on drop
#[derive(Debug)]
pub struct PendingGuard {
    count: Arc<watch::Sender<usize>>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.count.send_modify(|count| *count = count.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_guard_counts() {
        let pending = PendingWork::new();
        let a = pending.guard();
        let b = pending.guard();
        assert_eq!(pending.count(), 2);
        drop(a);
        assert_eq!(pending.count(), 1);
        drop(b);
        assert!(pending.is_idle());
    }

    #[tokio::test]
    async fn test_wait_ready_when_idle() {
        let pending = PendingWork::new();
        tokio::time::timeout(Duration::from_secs(1), pending.wait_ready())
            .await
            .expect("idle counter should resolve immediately");
    }

    #[tokio::test]
    async fn test_wait_ready_after_guard_drops() {
        let pending = PendingWork::new();
        let guard = pending.guard();

        let waiter = {
            let pending = pending.clone();
            tokio::spawn(async move { pending.wait_ready().await })
        };

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("barrier should resolve")
            .expect("task should not panic");
    }

    #[tokio::test]
    async fn test_reentrant_guard_keeps_barrier_closed() {
        let pending = PendingWork::new();
        let first = pending.guard();

        let waiter = {
            let pending = pending.clone();
            tokio::spawn(async move { pending.wait_ready().await })
        };

        // A new guard taken before the old one drops keeps the count above zero.
        let second = pending.guard();
        drop(first);
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(second);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("barrier should resolve")
            .expect("task should not panic");
    }
}
