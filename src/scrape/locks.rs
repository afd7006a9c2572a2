//! Per-target serialization of scrapes

use std::collections::HashMap;
use std::sync::{Arc, Mutex as SyncMutex, MutexGuard, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockMap = HashMap<String, Arc<Mutex<()>>>;

/// Keyed async mutexes, one per target URL
///
/// Holding the guard for a target makes a second scrape of that target wait.
/// Other targets are unaffected. Process-local only. An entry lives only
/// while some scrape holds or waits for it.
#[derive(Clone, Default)]
pub struct TargetLocks {
    locks: Arc<SyncMutex<LockMap>>,
}

/// Held for the duration of one scrape of a target
pub struct TargetGuard {
    target: String,
    locks: Arc<SyncMutex<LockMap>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl TargetLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, target: &str) -> TargetGuard {
        let lock = lock_map(&self.locks)
            .entry(target.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        TargetGuard {
            target: target.to_string(),
            locks: self.locks.clone(),
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Whether a scrape of `target` currently holds the lock
    pub fn is_locked(&self, target: &str) -> bool {
        match lock_map(&self.locks).get(target) {
            Some(lock) => lock.try_lock().is_err(),
            None => false,
        }
    }

    /// Targets with a holder or a waiter
    pub fn len(&self) -> usize {
        lock_map(&self.locks).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for TargetGuard {
    fn drop(&mut self) {
        drop(self.guard.take());

        // Waiters hold their own clone, so a count of one is the map's alone.
        let mut locks = lock_map(&self.locks);
        if locks
            .get(&self.target)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.target);
        }
    }
}

/// The map is never held across an await, so a poisoned lock still has
/// consistent contents
fn lock_map(locks: &SyncMutex<LockMap>) -> MutexGuard<'_, LockMap> {
    locks.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_target_waits() {
        let locks = TargetLocks::new();
        let guard = locks.acquire("https://x.test/a").await;
        assert!(locks.is_locked("https://x.test/a"));

        let contender = locks.clone();
        let waiting = tokio::spawn(async move {
            let _g = contender.acquire("https://x.test/a").await;
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiting.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiting)
            .await
            .unwrap()
            .unwrap();
        assert!(!locks.is_locked("https://x.test/a"));
    }

    #[tokio::test]
    async fn test_other_targets_proceed() {
        let locks = TargetLocks::new();
        let _a = locks.acquire("https://x.test/a").await;
        let b = tokio::time::timeout(Duration::from_millis(200), locks.acquire("https://x.test/b")).await;
        assert!(b.is_ok());
        assert!(!locks.is_locked("https://x.test/c"));
    }

    #[tokio::test]
    async fn test_released_targets_are_forgotten() {
        let locks = TargetLocks::new();
        for page in 1..=20 {
            let _g = locks
                .acquire(&format!("https://x.test/collections/fiction?page={page}"))
                .await;
            assert_eq!(locks.len(), 1);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_entry_survives_while_waiter_queued() {
        let locks = TargetLocks::new();
        let first = locks.acquire("https://x.test/a").await;

        let contender = locks.clone();
        let (acquired_tx, acquired_rx) = tokio::sync::oneshot::channel::<()>();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let waiting = tokio::spawn(async move {
            let _g = contender.acquire("https://x.test/a").await;
            let _ = acquired_tx.send(());
            let _ = release_rx.await;
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(first);
        acquired_rx.await.unwrap();

        // The waiter now owns the lock; its entry is still tracked
        assert_eq!(locks.len(), 1);
        assert!(locks.is_locked("https://x.test/a"));

        release_tx.send(()).unwrap();
        waiting.await.unwrap();
        assert!(locks.is_empty());
    }
}
