use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time;

/// Countdown barrier: starts at `count`, each completion decrements it and
/// waiters are released once it reaches zero.
///
/// The count saturates at zero, so completions that arrive after a waiter
/// gave up are harmless.
#[derive(Debug)]
pub struct CountdownLatch {
    count: AtomicUsize,
    notify: Notify,
}

impl CountdownLatch {
    pub fn new(count: usize) -> Self {
        CountdownLatch {
            count: AtomicUsize::new(count),
            notify: Notify::new(),
        }
    }

    /// Returns the remaining count, or `None` if the latch was already open.
    pub fn count_down(&self) -> Option<usize> {
        let previous = self
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| c.checked_sub(1))
            .ok()?;
        let remaining = previous - 1;
        if remaining == 0 {
            self.notify.notify_waiters();
        }
        Some(remaining)
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    pub fn is_open(&self) -> bool {
        self.count() == 0
    }

    /// Waits until the count reaches zero. Returns `false` on timeout.
    pub async fn wait(&self, timeout: Duration) -> bool {
        time::timeout(timeout, self.wait_open()).await.is_ok()
    }

    async fn wait_open(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // register before checking, otherwise the last count_down may be missed
            notified.as_mut().enable();
            if self.is_open() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_count_down_saturates() {
        let latch = CountdownLatch::new(2);
        assert_eq!(latch.count_down(), Some(1));
        assert_eq!(latch.count_down(), Some(0));
        assert_eq!(latch.count_down(), None);
        assert_eq!(latch.count(), 0);
        assert!(latch.is_open());
    }

    #[tokio::test]
    async fn test_wait_on_open_latch_returns_immediately() {
        let latch = CountdownLatch::new(0);
        assert!(latch.wait(Duration::from_millis(10)).await);
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let latch = CountdownLatch::new(3);
        latch.count_down();
        assert!(!latch.wait(Duration::from_millis(50)).await);
        assert_eq!(latch.count(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_count_down_releases_waiter() {
        let latch = Arc::new(CountdownLatch::new(100));
        let waiter = {
            let latch = latch.clone();
            tokio::spawn(async move { latch.wait(Duration::from_secs(5)).await })
        };
        for _ in 0..100 {
            let latch = latch.clone();
            tokio::spawn(async move {
                latch.count_down();
            });
        }
        assert!(waiter.await.unwrap());
        assert!(latch.is_open());
    }
}
