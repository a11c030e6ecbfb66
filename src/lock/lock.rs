use std::time::Duration;

use super::LockError;

/// Opaque token for a held named lock.
///
/// Created by [`LockProvider::acquire`] and consumed by
/// [`LockProvider::release`], so a handle can only be released once.
#[derive(Debug, PartialEq, Eq)]
pub struct LockHandle {
    key: String,
    token: u64,
}

impl LockHandle {
    pub(crate) fn new(key: impl Into<String>, token: u64) -> Self {
        LockHandle {
            key: key.into(),
            token,
        }
    }

    /// The key this handle holds.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn token(&self) -> u64 {
        self.token
    }
}

/// Advisory mutual exclusion keyed by an arbitrary string.
///
/// The keyspace is independent of any row locking done by a
/// [`CounterStore`](crate::CounterStore). In-memory providers use
/// `Mutex` + `Condvar`; distributed providers might use MySQL `GET_LOCK`,
/// Postgres advisory locks, Redis, etcd leases, etc.
pub trait LockProvider: Send + Sync {
    /// Acquire the lock for `key`, blocking until it becomes available.
    ///
    /// With `timeout` set, gives up with [`LockError::Timeout`] once it elapses.
    fn acquire(&self, key: &str, timeout: Option<Duration>) -> Result<LockHandle, LockError>;

    /// Try to acquire the lock without blocking.
    /// Returns `Ok(None)` if it is already held.
    fn try_acquire(&self, key: &str) -> Result<Option<LockHandle>, LockError>;

    /// Release a previously acquired lock.
    fn release(&self, handle: LockHandle) -> Result<(), LockError>;
}

impl<P: LockProvider + ?Sized> LockProvider for std::sync::Arc<P> {
    fn acquire(&self, key: &str, timeout: Option<Duration>) -> Result<LockHandle, LockError> {
        (**self).acquire(key, timeout)
    }

    fn try_acquire(&self, key: &str) -> Result<Option<LockHandle>, LockError> {
        (**self).try_acquire(key)
    }

    fn release(&self, handle: LockHandle) -> Result<(), LockError> {
        (**self).release(handle)
    }
}
