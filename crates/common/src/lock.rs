//! The exclusion lock gating block mutation against collection.
//!
//! Block additions hold it shared; block removal, pin mutation and
//!  collection hold it exclusively. Backed by `tokio::sync::RwLock`,
//!  whose FIFO queue means a waiting writer blocks readers that arrive
//!  after it, so a collection cycle cannot be starved by a stream of puts.
//!
//! Guards release on drop, which covers every exit path including `?`
//!  and a cancelled future.

use std::sync::Arc;

use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

#[derive(Debug, Clone, Default)]
pub struct GcLock {
    inner: Arc<RwLock<()>>,
}

/// Shared hold on the lock; dropped to release
#[derive(Debug)]
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct GcReadGuard {
    _guard: OwnedRwLockReadGuard<()>,
}

/// Exclusive hold on the lock; dropped to release
#[derive(Debug)]
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct GcWriteGuard {
    _guard: OwnedRwLockWriteGuard<()>,
}

impl GcLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for shared access
    pub async fn read(&self) -> GcReadGuard {
        tracing::trace!("acquiring gc lock (shared)");
        let guard = self.inner.clone().read_owned().await;
        tracing::trace!("acquired gc lock (shared)");
        GcReadGuard { _guard: guard }
    }

    /// Wait for exclusive access
    pub async fn write(&self) -> GcWriteGuard {
        tracing::debug!("acquiring gc lock (exclusive)");
        let guard = self.inner.clone().write_owned().await;
        tracing::debug!("acquired gc lock (exclusive)");
        GcWriteGuard { _guard: guard }
    }

    /// Exclusive access if nobody holds or waits for the lock
    pub fn try_write(&self) -> Option<GcWriteGuard> {
        self.inner
            .clone()
            .try_write_owned()
            .ok()
            .map(|guard| GcWriteGuard { _guard: guard })
    }
}

impl GcReadGuard {
    pub fn release(self) {
        tracing::trace!("released gc lock (shared)");
    }
}

impl GcWriteGuard {
    pub fn release(self) {
        tracing::debug!("released gc lock (exclusive)");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use super::*;

    const SHORT: Duration = Duration::from_millis(50);

    #[tokio::test]
    async fn test_shared_holders_run_concurrently() {
        let lock = GcLock::new();
        let first = lock.read().await;
        let second = tokio::time::timeout(SHORT, lock.read()).await;
        assert!(second.is_ok());
        assert!(lock.try_write().is_none());
        first.release();
    }

    #[tokio::test]
    async fn test_exclusive_waits_for_shared() {
        let lock = GcLock::new();
        let reader = lock.read().await;
        let acquired = Arc::new(AtomicBool::new(false));

        let writer = {
            let lock = lock.clone();
            let acquired = acquired.clone();
            tokio::spawn(async move {
                let _guard = lock.write().await;
                acquired.store(true, Ordering::SeqCst);
            })
        };

        tokio::time::sleep(SHORT).await;
        assert!(!acquired.load(Ordering::SeqCst));

        drop(reader);
        writer.await.unwrap();
        assert!(acquired.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_queued_writer_blocks_new_readers() {
        let lock = GcLock::new();
        let reader = lock.read().await;

        let writer = {
            let lock = lock.clone();
            tokio::spawn(async move {
                let guard = lock.write().await;
                tokio::time::sleep(SHORT).await;
                guard.release();
            })
        };
        tokio::time::sleep(SHORT).await;

        // the writer is queued behind `reader`, so a new reader must wait
        let late_reader = tokio::time::timeout(SHORT, lock.read()).await;
        assert!(late_reader.is_err());

        drop(reader);
        writer.await.unwrap();
        let _late = tokio::time::timeout(SHORT, lock.read()).await.unwrap();
    }

    #[tokio::test]
    async fn test_guard_released_on_error_path() {
        async fn failing(lock: &GcLock) -> Result<(), &'static str> {
            let _guard = lock.write().await;
            Err("boom")
        }

        let lock = GcLock::new();
        assert!(failing(&lock).await.is_err());
        assert!(lock.try_write().is_some());
    }
}
