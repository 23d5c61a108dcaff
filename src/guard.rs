//! Exclusive access guard for the index + registry pair.
//!
//! The two stores are independently mutable but must stay consistent as a
//! pair: a chunk must never exist without its owning document record and
//! vice versa. Every multi-step mutation (and every read that must not see a
//! half-written ingestion) runs while holding the permit returned by
//! [`ExclusiveGuard::acquire`].
//!
//! Waiters are served in FIFO order. The guard is not reentrant: acquiring
//! it again from a task that already holds the permit deadlocks by design —
//! a documented caller obligation, not a runtime-detected error. Dropping
//! the permit (normally or on error) releases the next waiter; a failed
//! operation never stalls the queue.

use tokio::sync::{Mutex, MutexGuard};

pub struct ExclusiveGuard {
    inner: Mutex<()>,
}

impl ExclusiveGuard {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(()),
        }
    }

    /// Wait for exclusive access. The returned permit releases on drop.
    pub async fn acquire(&self) -> MutexGuard<'_, ()> {
        self.inner.lock().await
    }
}

impl Default for ExclusiveGuard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex as StdMutex};
    use std::time::Duration;

    #[tokio::test]
    async fn test_waiters_run_in_fifo_order() {
        let guard = Arc::new(ExclusiveGuard::new());
        let order = Arc::new(StdMutex::new(Vec::new()));

        let held = guard.acquire().await;

        let mut handles = Vec::new();
        for i in 0..5 {
            let guard = guard.clone();
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                let _permit = guard.acquire().await;
                order.lock().unwrap().push(i);
            }));
            // Give each task time to enqueue before spawning the next.
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert!(order.lock().unwrap().is_empty());
        drop(held);

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_failure_releases_the_guard() {
        let guard = ExclusiveGuard::new();

        let failed: Result<(), &str> = async {
            let _permit = guard.acquire().await;
            Err("operation failed")
        }
        .await;
        assert!(failed.is_err());

        // The queue continues: a later acquisition succeeds immediately.
        let reacquired = tokio::time::timeout(Duration::from_millis(100), guard.acquire()).await;
        assert!(reacquired.is_ok());
    }
}
