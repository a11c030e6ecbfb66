use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::{LockError, LockHandle, LockProvider};

/// A single named lock backed by `Mutex<Option<u64>>` + `Condvar`.
///
/// The slot holds the token of the current holder, so a release with a stale
/// or foreign handle is rejected instead of unlocking someone else's section.
struct InMemoryLock {
    holder: Mutex<Option<u64>>,
    wake: Condvar,
}

impl InMemoryLock {
    fn new() -> Self {
        InMemoryLock {
            holder: Mutex::new(None),
            wake: Condvar::new(),
        }
    }

    fn lock(&self, key: &str, token: u64, timeout: Option<Duration>) -> Result<(), LockError> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut holder = self
            .holder
            .lock()
            .map_err(|e| LockError::Poisoned(e.to_string()))?;
        while holder.is_some() {
            holder = match deadline {
                None => self
                    .wake
                    .wait(holder)
                    .map_err(|e| LockError::Poisoned(e.to_string()))?,
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(LockError::Timeout {
                            key: key.to_string(),
                        });
                    }
                    self.wake
                        .wait_timeout(holder, deadline - now)
                        .map_err(|e| LockError::Poisoned(e.to_string()))?
                        .0
                }
            };
        }
        *holder = Some(token);
        Ok(())
    }

    fn try_lock(&self, token: u64) -> Result<bool, LockError> {
        let mut holder = self
            .holder
            .lock()
            .map_err(|e| LockError::Poisoned(e.to_string()))?;
        if holder.is_some() {
            Ok(false)
        } else {
            *holder = Some(token);
            Ok(true)
        }
    }

    fn unlock(&self, key: &str, token: u64) -> Result<(), LockError> {
        let mut holder = self
            .holder
            .lock()
            .map_err(|e| LockError::Poisoned(e.to_string()))?;
        if *holder != Some(token) {
            return Err(LockError::NotHeld {
                key: key.to_string(),
            });
        }
        *holder = None;
        self.wake.notify_one();
        Ok(())
    }

    fn is_locked(&self) -> Result<bool, LockError> {
        Ok(self
            .holder
            .lock()
            .map_err(|e| LockError::Poisoned(e.to_string()))?
            .is_some())
    }
}

/// In-memory named lock provider backed by a `HashMap<String, Arc<InMemoryLock>>`.
///
/// Lazily creates one lock per unique key and drops it again once it is
/// released with no waiters. Mutual exclusion only spans the process; share
/// one provider (e.g. behind an `Arc`) between all callers.
pub struct InMemoryLockProvider {
    locks: Mutex<HashMap<String, Arc<InMemoryLock>>>,
    next_token: AtomicU64,
}

impl InMemoryLockProvider {
    pub fn new() -> Self {
        InMemoryLockProvider {
            locks: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(1),
        }
    }

    /// Whether `key` is currently held by anyone.
    pub fn is_locked(&self, key: &str) -> Result<bool, LockError> {
        match self.existing_lock(key)? {
            Some(lock) => lock.is_locked(),
            None => Ok(false),
        }
    }

    fn map(&self) -> Result<MutexGuard<'_, HashMap<String, Arc<InMemoryLock>>>, LockError> {
        self.locks
            .lock()
            .map_err(|_| LockError::Poisoned("lock provider map poisoned".into()))
    }

    fn get_lock(&self, key: &str) -> Result<Arc<InMemoryLock>, LockError> {
        let mut locks = self.map()?;
        Ok(locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(InMemoryLock::new()))
            .clone())
    }

    fn existing_lock(&self, key: &str) -> Result<Option<Arc<InMemoryLock>>, LockError> {
        Ok(self.map()?.get(key).cloned())
    }

    /// Drop the entry for `key` if it is unheld and nobody else references it.
    ///
    /// Every clone is taken under the map mutex, so a count of one here means
    /// no caller is waiting on or about to lock this entry.
    fn prune(&self, key: &str) -> Result<(), LockError> {
        let mut locks = self.map()?;
        let idle = match locks.get(key) {
            Some(lock) => Arc::strong_count(lock) == 1 && !lock.is_locked()?,
            None => false,
        };
        if idle {
            locks.remove(key);
        }
        Ok(())
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.locks.lock().unwrap().len()
    }

    fn issue_token(&self) -> u64 {
        self.next_token.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for InMemoryLockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LockProvider for InMemoryLockProvider {
    fn acquire(&self, key: &str, timeout: Option<Duration>) -> Result<LockHandle, LockError> {
        let lock = self.get_lock(key)?;
        let token = self.issue_token();
        if let Err(err) = lock.lock(key, token, timeout) {
            drop(lock);
            self.prune(key)?;
            return Err(err);
        }
        tracing::trace!(lock_key = key, token, "named lock acquired");
        Ok(LockHandle::new(key, token))
    }

    fn try_acquire(&self, key: &str) -> Result<Option<LockHandle>, LockError> {
        let lock = self.get_lock(key)?;
        let token = self.issue_token();
        if lock.try_lock(token)? {
            return Ok(Some(LockHandle::new(key, token)));
        }
        drop(lock);
        self.prune(key)?;
        Ok(None)
    }

    fn release(&self, handle: LockHandle) -> Result<(), LockError> {
        let lock = self
            .existing_lock(handle.key())?
            .ok_or_else(|| LockError::NotHeld {
                key: handle.key().to_string(),
            })?;
        lock.unlock(handle.key(), handle.token())?;
        drop(lock);
        self.prune(handle.key())?;
        tracing::trace!(lock_key = handle.key(), "named lock released");
        Ok(())
    }
}
