//! Bounded-wait concurrent collection.
//!
//! # Responsibilities
//! - Serialize add/remove under an exclusive lock
//! - Let iteration work on a snapshot taken under a shared lock
//! - Isolate per-item failures during iteration
//!
//! # Design Decisions
//! - Every lock acquisition is bounded by the collection's timeout; a timeout
//!   is reported, never waited out
//! - Actions run after the shared lock is released, so an action may await
//!   or call back into the collection without deadlocking

use std::error::Error as StdError;
use std::future::Future;
use std::time::Duration;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::time;

use crate::observability::metrics;
use crate::subscriptions::error::{ForEachError, LockTimeout};

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(1000);

/// Thread-safe list of items with bounded lock waits.
#[derive(Debug)]
pub struct ConcurrentCollection<T> {
    items: RwLock<Vec<T>>,
    lock_timeout: Duration,
}

impl<T> ConcurrentCollection<T>
where
    T: PartialEq + Clone + Send + Sync,
{
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            items: RwLock::new(Vec::new()),
            lock_timeout,
        }
    }

    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    /// Insert `item`. Returns false on lock timeout, or if `avoid_duplicates`
    /// is set and an equal item is already present.
    pub async fn try_add(&self, item: T, avoid_duplicates: bool) -> bool {
        self.add(item, avoid_duplicates).await.unwrap_or(false)
    }

    /// Like [`try_add`](Self::try_add), but reports a lock timeout as an
    /// error instead of folding it into `false`.
    pub async fn add(&self, item: T, avoid_duplicates: bool) -> Result<bool, LockTimeout> {
        let mut items = self.write("add").await?;

        if avoid_duplicates && items.contains(&item) {
            return Ok(false);
        }

        items.push(item);
        Ok(true)
    }

    /// Remove the first item equal to `item`. Returns false on lock timeout or
    /// if no such item exists.
    pub async fn try_remove(&self, item: &T) -> bool {
        let Ok(mut items) = self.write("remove").await else {
            return false;
        };

        match items.iter().position(|existing| existing == item) {
            Some(index) => {
                items.remove(index);
                true
            }
            None => false,
        }
    }

    pub async fn clear(&self) -> Result<(), LockTimeout> {
        self.write("clear").await?.clear();
        Ok(())
    }

    /// Copy of the current items.
    pub async fn snapshot(&self) -> Result<Vec<T>, LockTimeout> {
        Ok(self.read().await?.clone())
    }

    pub async fn len(&self) -> Result<usize, LockTimeout> {
        Ok(self.read().await?.len())
    }

    pub async fn is_empty(&self) -> Result<bool, LockTimeout> {
        Ok(self.read().await?.is_empty())
    }

    /// Run `action` on a snapshot of the items, one at a time.
    ///
    /// Every item is visited even if earlier actions fail; the failures are
    /// returned together as [`ForEachError::Aggregate`].
    pub async fn for_each_async<F, Fut, E>(&self, mut action: F) -> Result<(), ForEachError<E>>
    where
        F: FnMut(T) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: StdError + 'static,
    {
        let items = self.snapshot().await?;

        let mut errors = Vec::new();
        for item in items {
            if let Err(e) = action(item).await {
                errors.push(e);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ForEachError::Aggregate(errors))
        }
    }

    #[cfg(test)]
    pub(crate) async fn lock_exclusive(&self) -> RwLockWriteGuard<'_, Vec<T>> {
        self.items.write().await
    }

    async fn read(&self) -> Result<RwLockReadGuard<'_, Vec<T>>, LockTimeout> {
        match time::timeout(self.lock_timeout, self.items.read()).await {
            Ok(guard) => Ok(guard),
            Err(_) => {
                tracing::warn!(timeout = ?self.lock_timeout, "Collection read lock timed out");
                metrics::record_lock_timeout("read");
                Err(LockTimeout(self.lock_timeout))
            }
        }
    }

    async fn write(&self, operation: &'static str) -> Result<RwLockWriteGuard<'_, Vec<T>>, LockTimeout> {
        match time::timeout(self.lock_timeout, self.items.write()).await {
            Ok(guard) => Ok(guard),
            Err(_) => {
                tracing::warn!(
                    operation,
                    timeout = ?self.lock_timeout,
                    "Collection write lock timed out"
                );
                metrics::record_lock_timeout(operation);
                Err(LockTimeout(self.lock_timeout))
            }
        }
    }
}

impl<T> Default for ConcurrentCollection<T>
where
    T: PartialEq + Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use thiserror::Error;

    #[derive(Debug, Error, PartialEq)]
    #[error("item {0} failed")]
    struct ItemFailed(u32);

    #[tokio::test]
    async fn test_add_and_remove() {
        let collection = ConcurrentCollection::new();
        assert!(collection.try_add(1u32, false).await);
        assert!(collection.try_add(1u32, false).await);
        assert!(!collection.try_add(1u32, true).await);
        assert_eq!(collection.len().await.unwrap(), 2);

        assert!(collection.try_remove(&1).await);
        assert!(collection.try_remove(&1).await);
        assert!(!collection.try_remove(&1).await);
        assert!(collection.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_clear() {
        let collection = ConcurrentCollection::new();
        collection.try_add(1u32, false).await;
        collection.try_add(2u32, false).await;
        collection.clear().await.unwrap();
        assert_eq!(collection.snapshot().await.unwrap(), Vec::<u32>::new());
    }

    #[tokio::test]
    async fn test_for_each_isolates_failures() {
        let collection = ConcurrentCollection::new();
        for i in 1..=4u32 {
            collection.try_add(i, false).await;
        }

        let mut visited = Vec::new();
        let result = collection
            .for_each_async(|item| {
                visited.push(item);
                async move {
                    if item % 2 == 0 {
                        Err(ItemFailed(item))
                    } else {
                        Ok(())
                    }
                }
            })
            .await;

        assert_eq!(visited, vec![1, 2, 3, 4]);
        match result {
            Err(ForEachError::Aggregate(errors)) => {
                assert_eq!(errors, vec![ItemFailed(2), ItemFailed(4)]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_action_may_mutate_collection() {
        let collection = Arc::new(ConcurrentCollection::new());
        collection.try_add(1u32, false).await;

        let inner = collection.clone();
        collection
            .for_each_async(|item| {
                let inner = inner.clone();
                async move {
                    assert!(inner.try_remove(&item).await);
                    assert!(inner.try_add(item + 10, false).await);
                    Ok::<(), ItemFailed>(())
                }
            })
            .await
            .unwrap();

        assert_eq!(collection.snapshot().await.unwrap(), vec![11]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lock_timeout_fails_fast() {
        let collection = ConcurrentCollection::with_lock_timeout(Duration::from_millis(50));
        collection.try_add(1u32, false).await;

        let held = collection.items.read().await;
        assert!(!collection.try_add(2, false).await);
        assert!(!collection.try_remove(&1).await);
        assert_eq!(
            collection.clear().await,
            Err(LockTimeout(Duration::from_millis(50)))
        );
        drop(held);

        let writer = collection.items.write().await;
        let result = collection
            .for_each_async(|_| async { Ok::<(), ItemFailed>(()) })
            .await;
        assert!(matches!(result, Err(ForEachError::Lock(_))));
        drop(writer);

        assert_eq!(collection.snapshot().await.unwrap(), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_tells_timeout_from_duplicate() {
        let collection = ConcurrentCollection::with_lock_timeout(Duration::from_millis(50));
        assert_eq!(collection.add(1u32, true).await, Ok(true));
        assert_eq!(collection.add(1u32, true).await, Ok(false));

        let held = collection.lock_exclusive().await;
        assert_eq!(
            collection.add(2u32, true).await,
            Err(LockTimeout(Duration::from_millis(50)))
        );
        drop(held);

        assert_eq!(collection.snapshot().await.unwrap(), vec![1]);
    }
}
