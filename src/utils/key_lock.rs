use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Per-key async locks used to serialise toggles on the same (user, article) pair.
///
/// Entries are created on demand and dropped once no task holds or waits on them.
#[derive(Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<String, Entry>>,
}

struct Entry {
    lock: Arc<AsyncMutex<()>>,
    /// Holders plus waiters
    users: usize,
}

pub struct KeyGuard<'a> {
    owner: &'a KeyedLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.locks.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub async fn lock(&self, key: impl Into<String>) -> KeyGuard<'_> {
        let key = key.into();
        let lock = {
            let mut locks = self.entries();
            let entry = locks.entry(key.clone()).or_insert_with(|| Entry {
                lock: Arc::new(AsyncMutex::new(())),
                users: 0,
            });
            entry.users += 1;
            entry.lock.clone()
        };

        // Registered before waiting so a cancelled waiter still gives up its slot
        let mut held = KeyGuard {
            owner: self,
            key,
            guard: None,
        };
        held.guard = Some(lock.lock_owned().await);
        held
    }

    /// Number of keys currently tracked
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    fn release(&self, key: &str) {
        let mut locks = self.entries();
        if let Some(entry) = locks.get_mut(key) {
            entry.users = entry.users.saturating_sub(1);
            if entry.users == 0 {
                locks.remove(key);
            }
        }
    }
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        self.owner.release(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_serialised() {
        let locks = Arc::new(KeyedLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let inside = inside.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock("user:article").await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = KeyedLocks::new();
        let _a = locks.lock("a").await;
        let _b = tokio::time::timeout(Duration::from_millis(50), locks.lock("b"))
            .await
            .expect("lock on another key should not wait");
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_waiter_leaves_no_entry() {
        let locks = KeyedLocks::new();
        let holder = locks.lock("k").await;

        let waited = tokio::time::timeout(Duration::from_millis(20), locks.lock("k")).await;
        assert!(waited.is_err());
        assert_eq!(locks.len(), 1);

        drop(holder);
        assert_eq!(locks.len(), 0);

        // The key is usable again afterwards
        let _again = locks.lock("k").await;
        assert_eq!(locks.len(), 1);
    }
}
